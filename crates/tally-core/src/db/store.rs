//! Local entry store contract

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::error::Result;
use crate::models::{DeletedEntry, DoneEntry, Entry, EntryId, EntryType, SyncConflict, SyncState};

use super::live::{EntryStream, LiveQuery};

/// Trait for local entry storage (async)
///
/// Implementations own the authoritative local copy of every entry,
/// completion and tombstone row. Each method is atomic on its own; multi-step
/// writes go through [`EntryStore::run_transactional`].
#[allow(async_fn_in_trait)]
pub trait EntryStore {
    /// Get an entry by ID
    async fn get_by_id(&self, id: &EntryId) -> Result<Option<Entry>>;

    /// List all entries of one variant
    async fn get_all_by_type(&self, entry_type: EntryType) -> Result<Vec<Entry>>;

    /// List all entries in the given sync state
    async fn get_all_by_state(&self, state: SyncState) -> Result<Vec<Entry>>;

    /// List entries visible on a calendar day
    async fn visible_on(&self, date: NaiveDate) -> Result<Vec<Entry>>;

    /// Write a local mutation unconditionally
    async fn insert_or_replace(&self, entry: &Entry) -> Result<()>;

    /// Write an entry only if it is newer than the stored one; returns whether it was applied
    async fn upsert_if_newest(&self, entry: &Entry) -> Result<bool>;

    /// Set an entry's sync state
    async fn update_sync_state(&self, id: &EntryId, state: SyncState) -> Result<()>;

    /// Remove an entry row
    async fn delete(&self, id: &EntryId) -> Result<()>;

    /// Completion history for an entry, oldest first
    async fn done_entries(&self, id: &EntryId) -> Result<Vec<DoneEntry>>;

    /// Get a deletion tombstone by ID
    async fn get_tombstone(&self, id: &EntryId) -> Result<Option<DeletedEntry>>;

    /// List tombstones in the given sync state
    async fn tombstones_by_state(&self, state: SyncState) -> Result<Vec<DeletedEntry>>;

    /// Set a tombstone's sync state
    async fn update_tombstone_state(&self, id: &EntryId, state: SyncState) -> Result<()>;

    /// Drop a tombstone after the remote delete is confirmed
    async fn purge_tombstone(&self, id: &EntryId) -> Result<()>;

    /// Recently rejected incoming writes, newest first
    async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>>;

    /// Run `work` inside a transaction.
    ///
    /// Everything written through the transaction becomes visible together
    /// when `work` returns `Ok`; any error rolls all of it back.
    async fn run_transactional<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn EntryTransaction) -> Result<T>;

    /// Change feed: the value advances after every committed write
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Live list of entries visible on `date`
    fn stream_visible_on(&self, date: NaiveDate) -> EntryStream<Self>
    where
        Self: Clone + Sized,
    {
        EntryStream::new(self.clone(), LiveQuery::VisibleOn(date))
    }

    /// Live list of entries waiting to be pushed
    fn stream_pending(&self) -> EntryStream<Self>
    where
        Self: Clone + Sized,
    {
        EntryStream::new(self.clone(), LiveQuery::Pending)
    }
}

/// Synchronous view of the store inside a transaction
pub trait EntryTransaction {
    fn get_by_id(&self, id: &EntryId) -> Result<Option<Entry>>;

    fn insert_or_replace(&mut self, entry: &Entry) -> Result<()>;

    /// Same rule as [`EntryStore::upsert_if_newest`], inside the transaction
    fn upsert_if_newest(&mut self, entry: &Entry) -> Result<bool>;

    /// Returns whether a row was removed
    fn delete(&mut self, id: &EntryId) -> Result<bool>;

    fn insert_tombstone(&mut self, tombstone: &DeletedEntry) -> Result<()>;

    fn get_tombstone(&self, id: &EntryId) -> Result<Option<DeletedEntry>>;

    fn update_tombstone_state(&mut self, id: &EntryId, state: SyncState) -> Result<()>;

    fn update_sync_state(&mut self, id: &EntryId, state: SyncState) -> Result<()>;

    /// Returns `false` when a completion already exists for that day
    fn insert_done_entry(&mut self, done: &DoneEntry) -> Result<bool>;

    /// Returns whether a completion was removed
    fn delete_done_entry(&mut self, id: &EntryId, date: NaiveDate) -> Result<bool>;

    fn done_entries(&self, id: &EntryId) -> Result<Vec<DoneEntry>>;
}
