//! Deterministic fakes shared by unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::watch;

use crate::clock::Clock;
use crate::db::{EntryStore, EntryTransaction};
use crate::error::{RemoteError, Result};
use crate::models::{DeletedEntry, DoneEntry, Entry, EntryId, EntryType, SyncConflict, SyncState};
use crate::reminder::ReminderScheduler;
use crate::remote::{EntryRepresentation, RemoteEntryApi};

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn at_millis(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap()
    }
}

/// Remote fake with scripted failures.
///
/// Successful pushes and deletes are recorded; `fetch_all` serves whatever
/// documents were queued with [`ScriptedRemote::serve`].
#[derive(Default)]
pub struct ScriptedRemote {
    push_failures: Mutex<VecDeque<RemoteError>>,
    rejected_ids: Mutex<HashMap<EntryId, fn() -> RemoteError>>,
    delete_failures: Mutex<VecDeque<RemoteError>>,
    fetch_failure: Mutex<Option<RemoteError>>,
    documents: Mutex<Vec<EntryRepresentation>>,
    pushes: Mutex<Vec<Entry>>,
    deletes: Mutex<Vec<EntryId>>,
    push_attempts: AtomicUsize,
    stalled: AtomicBool,
}

impl ScriptedRemote {
    /// Fail the next push (whichever entry it is) with `error`
    pub fn fail_next_push(&self, error: RemoteError) {
        self.push_failures.lock().unwrap().push_back(error);
    }

    /// Fail every push of `id`
    pub fn reject_pushes_of(&self, id: &EntryId, error: fn() -> RemoteError) {
        self.rejected_ids.lock().unwrap().insert(id.clone(), error);
    }

    pub fn fail_next_delete(&self, error: RemoteError) {
        self.delete_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_fetch(&self, error: RemoteError) {
        *self.fetch_failure.lock().unwrap() = Some(error);
    }

    pub fn serve(&self, document: EntryRepresentation) {
        self.documents.lock().unwrap().push(document);
    }

    /// Make every push hang until the caller gives up on it
    pub fn stall_pushes(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<Entry> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<EntryId> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn push_attempts(&self) -> usize {
        self.push_attempts.load(Ordering::SeqCst)
    }
}

impl RemoteEntryApi for ScriptedRemote {
    async fn push(&self, entry: &Entry) -> Result<()> {
        self.push_attempts.fetch_add(1, Ordering::SeqCst);
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(error) = self.push_failures.lock().unwrap().pop_front() {
            return Err(error.into());
        }
        if let Some(error) = self.rejected_ids.lock().unwrap().get(&entry.id) {
            return Err(error().into());
        }
        self.pushes.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<EntryRepresentation>> {
        if let Some(error) = self.fetch_failure.lock().unwrap().take() {
            return Err(error.into());
        }
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn delete(&self, id: &EntryId) -> Result<()> {
        if let Some(error) = self.delete_failures.lock().unwrap().pop_front() {
            return Err(error.into());
        }
        self.deletes.lock().unwrap().push(id.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderCall {
    Schedule {
        entry_id: EntryId,
        delay: Duration,
        interval: Option<Duration>,
    },
    Cancel(EntryId),
}

/// Scheduler that records every request
#[derive(Debug, Default)]
pub struct RecordingReminders {
    calls: Mutex<Vec<ReminderCall>>,
}

impl RecordingReminders {
    pub fn calls(&self) -> Vec<ReminderCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReminderScheduler for RecordingReminders {
    fn schedule_reminder(&self, entry_id: &EntryId, delay: Duration, interval: Option<Duration>) {
        self.calls.lock().unwrap().push(ReminderCall::Schedule {
            entry_id: entry_id.clone(),
            delay,
            interval,
        });
    }

    fn cancel_reminder(&self, entry_id: &EntryId) {
        self.calls
            .lock()
            .unwrap()
            .push(ReminderCall::Cancel(entry_id.clone()));
    }
}

type WriteHook = Box<dyn FnOnce(&mut dyn EntryTransaction) -> Result<()> + Send>;

/// Store wrapper that commits a scripted unit of work right before the next
/// transactional write, standing in for a concurrent caller
pub struct InterleavedStore<S> {
    inner: S,
    hook: Mutex<Option<WriteHook>>,
}

impl<S: EntryStore> InterleavedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            hook: Mutex::new(None),
        }
    }

    pub fn before_next_write(
        &self,
        hook: impl FnOnce(&mut dyn EntryTransaction) -> Result<()> + Send + 'static,
    ) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    async fn run_hook(&self) -> Result<()> {
        let hook = self.hook.lock().unwrap().take();
        match hook {
            Some(hook) => self.inner.run_transactional(hook).await,
            None => Ok(()),
        }
    }
}

impl<S: EntryStore> EntryStore for InterleavedStore<S> {
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
        self.inner.insert_or_replace(entry).await
    }

    async fn upsert_if_newest(&self, entry: &Entry) -> Result<bool> {
        self.run_hook().await?;
        self.inner.upsert_if_newest(entry).await
    }

    async fn update_sync_state(&self, id: &EntryId, state: SyncState) -> Result<()> {
        self.inner.update_sync_state(id, state).await
    }

    async fn delete(&self, id: &EntryId) -> Result<()> {
        self.inner.delete(id).await
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
        self.inner.update_tombstone_state(id, state).await
    }

    async fn purge_tombstone(&self, id: &EntryId) -> Result<()> {
        self.inner.purge_tombstone(id).await
    }

    async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        self.inner.list_conflicts(limit).await
    }

    async fn run_transactional<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn EntryTransaction) -> Result<T>,
    {
        self.run_hook().await?;
        self.inner.run_transactional(work).await
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.subscribe()
    }
}
