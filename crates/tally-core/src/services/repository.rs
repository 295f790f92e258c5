//! Repository facade used by front ends.
//!
//! Reads only touch the local store. Writes land locally first, then queue a
//! sync request and keep reminders in step with the saved entry.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::clock::Clock;
use crate::db::{EntryStore, EntryStream, SqliteEntryStore, TrackingEntryStore};
use crate::error::{Error, Result};
use crate::models::{DeletedEntry, DoneEntry, Entry, EntryId, EntryType, SyncConflict, SyncState};
use crate::reminder::{reminder_plan, ReminderScheduler};
use crate::remote::RemoteEntryApi;
use crate::sync::{CancellationSignal, SyncEngine, SyncRequest, SyncSummary, SyncTrigger};

/// The store stack front ends run on
pub type TrackedStore = TrackingEntryStore<SqliteEntryStore>;

/// Open the `SQLite` store at `path` wrapped in the tracking decorator
pub fn open_tracked_store(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<TrackedStore> {
    let inner = SqliteEntryStore::open(path, clock.clone())?;
    Ok(TrackingEntryStore::new(inner, clock))
}

/// Entry operations for UI and CLI callers
pub struct EntryRepository<S, R> {
    engine: Arc<SyncEngine<S, R>>,
    reminders: Arc<dyn ReminderScheduler>,
    trigger: Option<SyncTrigger>,
}

impl<S: EntryStore + Clone, R: RemoteEntryApi> EntryRepository<S, R> {
    pub fn new(engine: Arc<SyncEngine<S, R>>, reminders: Arc<dyn ReminderScheduler>) -> Self {
        Self {
            engine,
            reminders,
            trigger: None,
        }
    }

    /// Queue a sync request after every write
    #[must_use]
    pub fn with_trigger(mut self, trigger: SyncTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub const fn engine(&self) -> &Arc<SyncEngine<S, R>> {
        &self.engine
    }

    fn store(&self) -> &S {
        self.engine.store()
    }

    pub async fn get_tasks(&self) -> Result<Vec<Entry>> {
        self.store().get_all_by_type(EntryType::Task).await
    }

    pub async fn get_habits(&self) -> Result<Vec<Entry>> {
        self.store().get_all_by_type(EntryType::Habit).await
    }

    pub async fn get_entry(&self, id: &EntryId) -> Result<Option<Entry>> {
        self.store().get_by_id(id).await
    }

    pub async fn visible_on(&self, date: NaiveDate) -> Result<Vec<Entry>> {
        self.store().visible_on(date).await
    }

    /// Live list of entries visible on `date`
    pub fn stream_visible_on(&self, date: NaiveDate) -> EntryStream<S> {
        self.store().stream_visible_on(date)
    }

    /// Live list of entries waiting to be pushed
    pub fn stream_pending(&self) -> EntryStream<S> {
        self.store().stream_pending()
    }

    /// Save a new or edited entry and return the stored copy
    pub async fn save_entry(&self, entry: &Entry) -> Result<Entry> {
        if entry.title.trim().is_empty() {
            return Err(Error::InvalidInput("title must not be empty".to_string()));
        }

        self.store().insert_or_replace(entry).await?;
        let saved = self
            .store()
            .get_by_id(&entry.id)
            .await?
            .ok_or_else(|| Error::NotFound(entry.id.to_string()))?;

        self.sync_reminder(&saved);
        self.request(SyncRequest::Entry(saved.id.clone()));
        Ok(saved)
    }

    pub async fn delete_entry(&self, id: &EntryId) -> Result<()> {
        self.engine.delete_entry(id).await?;
        self.reminders.cancel_reminder(id);
        self.request(SyncRequest::Deletion(id.clone()));
        Ok(())
    }

    pub async fn mark_done(&self, id: &EntryId, date: NaiveDate) -> Result<Entry> {
        let entry = self.engine.mark_entry_done(id, date).await?;
        self.sync_reminder(&entry);
        self.request(SyncRequest::Entry(id.clone()));
        Ok(entry)
    }

    pub async fn unmark_done(&self, id: &EntryId, date: NaiveDate) -> Result<Entry> {
        let entry = self.engine.unmark_entry_done(id, date).await?;
        self.sync_reminder(&entry);
        self.request(SyncRequest::Entry(id.clone()));
        Ok(entry)
    }

    /// Entries whose push was rejected permanently
    pub async fn failed_entries(&self) -> Result<Vec<Entry>> {
        self.store().get_all_by_state(SyncState::Failed).await
    }

    /// Deletes not yet confirmed by the remote, by state
    pub async fn deletions(&self, state: SyncState) -> Result<Vec<DeletedEntry>> {
        self.store().tombstones_by_state(state).await
    }

    /// Queue a failed entry or deletion for another attempt
    pub async fn retry_failed(&self, id: &EntryId) -> Result<bool> {
        let requeued = self.engine.retry_failed(id).await?;
        if requeued {
            let request = if self.store().get_by_id(id).await?.is_some() {
                SyncRequest::Entry(id.clone())
            } else {
                SyncRequest::Deletion(id.clone())
            };
            self.request(request);
        }
        Ok(requeued)
    }

    pub async fn done_history(&self, id: &EntryId) -> Result<Vec<DoneEntry>> {
        self.store().done_entries(id).await
    }

    pub async fn conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        self.store().list_conflicts(limit).await
    }

    /// Push pending changes and pull remote ones now
    pub async fn sync_now(&self, cancel: &CancellationSignal) -> SyncSummary {
        self.engine.sync_all(cancel).await
    }

    fn sync_reminder(&self, entry: &Entry) {
        match reminder_plan(entry, self.engine.clock().local_now()) {
            Some(plan) => self
                .reminders
                .schedule_reminder(&entry.id, plan.delay, plan.interval),
            None => self.reminders.cancel_reminder(&entry.id),
        }
    }

    fn request(&self, request: SyncRequest) {
        if let Some(trigger) = &self.trigger {
            if !trigger.request(request) {
                tracing::debug!("Sync worker not running, change stays pending");
            }
        }
    }
}
