//! Store decorator that stamps local writes and logs every mutation

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{DeletedEntry, DoneEntry, Entry, EntryId, EntryType, SyncConflict, SyncState};

use super::store::{EntryStore, EntryTransaction};

/// Prepare a user edit for storage.
///
/// `updated_at` becomes `now`, bumped past the stored value when the clock
/// lags behind it, so a local edit always sorts after what it replaces.
/// `created_at` of an existing row is preserved and the row is queued for push.
pub fn stamp_local_write(entry: &Entry, previous: Option<&Entry>, now_millis: i64) -> Entry {
    let mut stamped = entry.clone();
    let floor = previous
        .and_then(|previous| previous.updated_at)
        .map_or(i64::MIN, |updated_at| updated_at.saturating_add(1));
    stamped.updated_at = Some(now_millis.max(floor));
    if let Some(previous) = previous {
        stamped.created_at = previous.created_at;
    }
    stamped.sync_state = SyncState::Pending;
    stamped
}

/// Wraps an [`EntryStore`] and forwards every call to it.
///
/// `insert_or_replace` is treated as a user edit and stamped with
/// [`stamp_local_write`] inside one transaction. Merges through
/// `upsert_if_newest` keep their incoming timestamps.
#[derive(Clone)]
pub struct TrackingEntryStore<S> {
    inner: S,
    clock: Arc<dyn Clock>,
}

impl<S: EntryStore> TrackingEntryStore<S> {
    pub fn new(inner: S, clock: Arc<dyn Clock>) -> Self {
        Self { inner, clock }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: EntryStore> EntryStore for TrackingEntryStore<S> {
    async fn get_by_id(&self, id: &EntryId) -> Result<Option<Entry>> {
        self.inner.get_by_id(id).await
    }

    async fn get_all_by_type(&self, entry_type: EntryType) -> Result<Vec<Entry>> {
        self.inner.get_all_by_type(entry_type).await
    }

    async fn get_all_by_state(&self, state: SyncState) -> Result<Vec<Entry>> {
        self.inner.get_all_by_state(state).await
    }

    async fn visible_on(&self, date: NaiveDate) -> Result<Vec<Entry>> {
        self.inner.visible_on(date).await
    }

    async fn insert_or_replace(&self, entry: &Entry) -> Result<()> {
        let now = self.clock.now_millis();
        let stamped = self
            .inner
            .run_transactional(|tx| {
                let previous = tx.get_by_id(&entry.id)?;
                let stamped = stamp_local_write(entry, previous.as_ref(), now);
                tx.insert_or_replace(&stamped)?;
                Ok(stamped)
            })
            .await?;

        tracing::debug!(
            entry_id = %stamped.id,
            entry_type = %stamped.entry_type(),
            updated_at = ?stamped.updated_at,
            "Stored local edit"
        );
        Ok(())
    }

    async fn upsert_if_newest(&self, entry: &Entry) -> Result<bool> {
        let applied = self.inner.upsert_if_newest(entry).await?;
        tracing::debug!(
            entry_id = %entry.id,
            incoming_updated_at = ?entry.updated_at,
            applied,
            "Merged incoming entry"
        );
        Ok(applied)
    }

    async fn update_sync_state(&self, id: &EntryId, state: SyncState) -> Result<()> {
        self.inner.update_sync_state(id, state).await?;
        tracing::debug!(entry_id = %id, %state, "Updated sync state");
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<()> {
        self.inner.delete(id).await?;
        tracing::debug!(entry_id = %id, "Deleted entry row");
        Ok(())
    }

    async fn done_entries(&self, id: &EntryId) -> Result<Vec<DoneEntry>> {
        self.inner.done_entries(id).await
    }

    async fn get_tombstone(&self, id: &EntryId) -> Result<Option<DeletedEntry>> {
        self.inner.get_tombstone(id).await
    }

    async fn tombstones_by_state(&self, state: SyncState) -> Result<Vec<DeletedEntry>> {
        self.inner.tombstones_by_state(state).await
    }

    async fn update_tombstone_state(&self, id: &EntryId, state: SyncState) -> Result<()> {
        self.inner.update_tombstone_state(id, state).await?;
        tracing::debug!(entry_id = %id, %state, "Updated tombstone state");
        Ok(())
    }

    async fn purge_tombstone(&self, id: &EntryId) -> Result<()> {
        self.inner.purge_tombstone(id).await?;
        tracing::debug!(entry_id = %id, "Purged tombstone");
        Ok(())
    }

    async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        self.inner.list_conflicts(limit).await
    }

    async fn run_transactional<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn EntryTransaction) -> Result<T>,
    {
        let result = self.inner.run_transactional(work).await;
        match &result {
            Ok(_) => tracing::trace!("Committed unit of work"),
            Err(error) => tracing::debug!(%error, "Rolled back unit of work"),
        }
        result
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.subscribe()
    }
}
