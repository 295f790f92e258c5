//! `SQLite` implementation of the entry store

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::Connection;
use tokio::sync::{watch, Mutex};

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{DeletedEntry, DoneEntry, Entry, EntryId, EntryType, SyncConflict, SyncState};

use super::queries::{self, UpsertOutcome};
use super::store::{EntryStore, EntryTransaction};
use super::Database;

/// Thread-safe `SQLite` entry store.
///
/// Clones share the same connection and change feed.
#[derive(Clone)]
pub struct SqliteEntryStore {
    db: Arc<Mutex<Database>>,
    changes: Arc<watch::Sender<u64>>,
    clock: Arc<dyn Clock>,
}

impl SqliteEntryStore {
    /// Wrap an already opened database
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            db: Arc::new(Mutex::new(db)),
            changes: Arc::new(changes),
            clock,
        }
    }

    /// Open (and migrate) a store at the given path
    pub fn open(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?, clock))
    }

    /// Open an in-memory store (primarily for tests)
    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?, clock))
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    async fn read<T>(&self, query: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let db = self.db.lock().await;
        query(db.connection())
    }

    async fn write<T>(&self, statement: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let value = {
            let db = self.db.lock().await;
            statement(db.connection())?
        };
        self.notify();
        Ok(value)
    }

    /// Run raw SQL against the connection (test fixtures only)
    #[cfg(test)]
    pub(crate) async fn execute_batch(&self, sql: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute_batch(sql)?;
        Ok(())
    }
}

impl EntryStore for SqliteEntryStore {
    async fn get_by_id(&self, id: &EntryId) -> Result<Option<Entry>> {
        self.read(|conn| queries::get_entry(conn, id)).await
    }

    async fn get_all_by_type(&self, entry_type: EntryType) -> Result<Vec<Entry>> {
        self.read(|conn| queries::list_by_type(conn, entry_type))
            .await
    }

    async fn get_all_by_state(&self, state: SyncState) -> Result<Vec<Entry>> {
        self.read(|conn| queries::list_by_state(conn, state)).await
    }

    async fn visible_on(&self, date: NaiveDate) -> Result<Vec<Entry>> {
        self.read(|conn| queries::list_visible_on(conn, date)).await
    }

    async fn insert_or_replace(&self, entry: &Entry) -> Result<()> {
        self.write(|conn| queries::insert_or_replace(conn, entry))
            .await
    }

    async fn upsert_if_newest(&self, entry: &Entry) -> Result<bool> {
        self.run_transactional(|tx| tx.upsert_if_newest(entry))
            .await
    }

    async fn update_sync_state(&self, id: &EntryId, state: SyncState) -> Result<()> {
        self.write(|conn| queries::update_sync_state(conn, id, state))
            .await
    }

    async fn delete(&self, id: &EntryId) -> Result<()> {
        self.write(|conn| queries::delete_entry(conn, id).map(|_| ()))
            .await
    }

    async fn done_entries(&self, id: &EntryId) -> Result<Vec<DoneEntry>> {
        self.read(|conn| queries::list_done(conn, id)).await
    }

    async fn get_tombstone(&self, id: &EntryId) -> Result<Option<DeletedEntry>> {
        self.read(|conn| queries::get_tombstone(conn, id)).await
    }

    async fn tombstones_by_state(&self, state: SyncState) -> Result<Vec<DeletedEntry>> {
        self.read(|conn| queries::list_tombstones(conn, state))
            .await
    }

    async fn update_tombstone_state(&self, id: &EntryId, state: SyncState) -> Result<()> {
        self.write(|conn| queries::update_tombstone_state(conn, id, state))
            .await
    }

    async fn purge_tombstone(&self, id: &EntryId) -> Result<()> {
        self.write(|conn| queries::purge_tombstone(conn, id)).await
    }

    async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        self.read(|conn| queries::list_conflicts(conn, limit)).await
    }

    async fn run_transactional<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn EntryTransaction) -> Result<T>,
    {
        let (value, changed) = {
            let mut db = self.db.lock().await;
            let tx = db.connection_mut().transaction()?;
            let mut unit = SqliteTransaction {
                conn: &tx,
                now_millis: self.clock.now_millis(),
                changed: false,
            };
            // Dropping `tx` without commit rolls back.
            let value = work(&mut unit)?;
            let changed = unit.changed;
            tx.commit()?;
            (value, changed)
        };
        if changed {
            self.notify();
        }
        Ok(value)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

/// Transaction-scoped view handed to units of work.
///
/// `changed` records whether anything readers can see was written, so
/// no-op units of work do not wake live queries.
struct SqliteTransaction<'a> {
    conn: &'a Connection,
    now_millis: i64,
    changed: bool,
}

impl SqliteTransaction<'_> {
    fn mark(&mut self, changed: bool) -> bool {
        self.changed |= changed;
        changed
    }
}

impl EntryTransaction for SqliteTransaction<'_> {
    fn get_by_id(&self, id: &EntryId) -> Result<Option<Entry>> {
        queries::get_entry(self.conn, id)
    }

    fn insert_or_replace(&mut self, entry: &Entry) -> Result<()> {
        queries::insert_or_replace(self.conn, entry)?;
        self.mark(true);
        Ok(())
    }

    fn upsert_if_newest(&mut self, entry: &Entry) -> Result<bool> {
        match queries::upsert_if_newest(self.conn, entry, self.now_millis)? {
            UpsertOutcome::Applied => Ok(self.mark(true)),
            UpsertOutcome::Ignored(resolution) => {
                tracing::debug!(
                    entry_id = %entry.id,
                    ?resolution,
                    "Kept stored entry over incoming copy"
                );
                Ok(false)
            }
        }
    }

    fn delete(&mut self, id: &EntryId) -> Result<bool> {
        let removed = queries::delete_entry(self.conn, id)?;
        Ok(self.mark(removed))
    }

    fn insert_tombstone(&mut self, tombstone: &DeletedEntry) -> Result<()> {
        queries::insert_tombstone(self.conn, tombstone)?;
        self.mark(true);
        Ok(())
    }

    fn get_tombstone(&self, id: &EntryId) -> Result<Option<DeletedEntry>> {
        queries::get_tombstone(self.conn, id)
    }

    fn update_tombstone_state(&mut self, id: &EntryId, state: SyncState) -> Result<()> {
        queries::update_tombstone_state(self.conn, id, state)?;
        self.mark(true);
        Ok(())
    }

    fn update_sync_state(&mut self, id: &EntryId, state: SyncState) -> Result<()> {
        queries::update_sync_state(self.conn, id, state)?;
        self.mark(true);
        Ok(())
    }

    fn insert_done_entry(&mut self, done: &DoneEntry) -> Result<bool> {
        let recorded = queries::insert_done(self.conn, done)?;
        Ok(self.mark(recorded))
    }

    fn delete_done_entry(&mut self, id: &EntryId, date: NaiveDate) -> Result<bool> {
        let removed = queries::delete_done(self.conn, id, date)?;
        Ok(self.mark(removed))
    }

    fn done_entries(&self, id: &EntryId) -> Result<Vec<DoneEntry>> {
        queries::list_done(self.conn, id)
    }
}
