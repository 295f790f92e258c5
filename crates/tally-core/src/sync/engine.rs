//! Reconciliation between the local store and the remote entry store.
//!
//! Local writes land in the store first and are marked `Pending`; the engine
//! pushes them, advances their sync state and merges remote copies back in
//! with the upsert-if-newest rule. Sync attempts never return raw errors:
//! every failure is classified and reported as an outcome.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::clock::Clock;
use crate::db::{stamp_local_write, EntryStore, EntryTransaction};
use crate::error::{Error, RemoteError, Result};
use crate::models::{compute_streak, DeletedEntry, DoneEntry, Entry, EntryId, EntryKind, SyncState};
use crate::remote::RemoteEntryApi;

use super::cancel::CancellationSignal;
use super::classifier::{ErrorClassifier, ErrorType, SyncErrorClassifier};

/// Result of one sync attempt for an entry or a tombstone
#[derive(Debug)]
pub enum SyncOutcome {
    /// The remote confirmed the write
    Synced,
    /// Nothing to push; carries the state found (or `Pending` when the row
    /// changed while the push was in flight)
    Skipped(SyncState),
    /// No local row for the id
    Missing,
    /// Transient failure, the row stays `Pending`
    Retry(ErrorType),
    /// Permanent failure, the row is marked `Failed`
    Failed(ErrorType),
}

impl SyncOutcome {
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }

    pub const fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// What a fan-out target was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    Entry,
    Deletion,
}

#[derive(Debug)]
pub struct TargetOutcome {
    pub id: EntryId,
    pub target: SyncTarget,
    pub outcome: SyncOutcome,
}

/// Outcome of pushing every pending entry and tombstone
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<TargetOutcome>,
    /// Listing pending rows failed
    pub failure: Option<ErrorType>,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn outcome_for(&self, id: &EntryId) -> Option<&SyncOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| &outcome.id == id)
            .map(|outcome| &outcome.outcome)
    }

    pub fn synced(&self) -> usize {
        self.count(SyncOutcome::is_synced)
    }

    pub fn retrying(&self) -> usize {
        self.count(SyncOutcome::is_retry)
    }

    pub fn failed(&self) -> usize {
        self.count(SyncOutcome::is_failed)
    }

    fn count(&self, predicate: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.outcome))
            .count()
    }
}

/// Outcome of merging remote documents into the local store
#[derive(Debug, Default)]
pub struct PullReport {
    pub applied: usize,
    pub stale: usize,
    pub tombstoned: usize,
    pub invalid: usize,
    /// First fetch or store failure, if any
    pub failure: Option<ErrorType>,
    pub cancelled: bool,
}

/// Push followed by pull
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub push: SyncReport,
    pub pull: PullReport,
}

impl SyncSummary {
    pub const fn cancelled(&self) -> bool {
        self.push.cancelled || self.pull.cancelled
    }
}

/// Result of merging a single remote entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// The stored copy is as new or newer
    Stale,
    /// A local delete is pending for this id
    Tombstoned,
}

/// Keeps the local store and the remote entry store eventually consistent
pub struct SyncEngine<S, R> {
    store: S,
    remote: R,
    classifier: Arc<dyn ErrorClassifier>,
    clock: Arc<dyn Clock>,
}

impl<S: EntryStore, R: RemoteEntryApi> SyncEngine<S, R> {
    pub fn new(store: S, remote: R, clock: Arc<dyn Clock>) -> Self {
        Self::with_classifier(store, remote, clock, Arc::new(SyncErrorClassifier::default()))
    }

    pub fn with_classifier(
        store: S,
        remote: R,
        clock: Arc<dyn Clock>,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Self {
        Self {
            store,
            remote,
            classifier,
            clock,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Push one pending entry and advance its sync state
    pub async fn sync_entry(&self, id: &EntryId) -> SyncOutcome {
        let entry = match self.store.get_by_id(id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return SyncOutcome::Missing,
            Err(error) => return self.store_failure(id, error),
        };
        if entry.sync_state != SyncState::Pending {
            return SyncOutcome::Skipped(entry.sync_state);
        }

        match self.remote.push(&entry).await {
            Ok(()) => match self.settle(&entry, SyncState::Synced).await {
                Ok(Some(true)) => {
                    tracing::info!(entry_id = %id, "Entry synced");
                    SyncOutcome::Synced
                }
                Ok(Some(false)) => {
                    tracing::debug!(entry_id = %id, "Entry changed during push, left pending");
                    SyncOutcome::Skipped(SyncState::Pending)
                }
                Ok(None) => SyncOutcome::Missing,
                Err(error) => self.store_failure(id, error),
            },
            Err(error) => {
                let classified = self.classifier.classify(error);
                if classified.is_transient() {
                    tracing::warn!(entry_id = %id, error = %classified, "Push failed, will retry");
                    return SyncOutcome::Retry(classified);
                }

                if let Err(store_error) = self.settle(&entry, SyncState::Failed).await {
                    tracing::warn!(entry_id = %id, error = %store_error, "Could not mark entry failed");
                }
                tracing::error!(entry_id = %id, error = %classified, "Push rejected");
                SyncOutcome::Failed(classified)
            }
        }
    }

    /// Push one pending tombstone as a remote delete
    pub async fn sync_deletion(&self, id: &EntryId) -> SyncOutcome {
        let tombstone = match self.store.get_tombstone(id).await {
            Ok(Some(tombstone)) => tombstone,
            Ok(None) => return SyncOutcome::Missing,
            Err(error) => return self.store_failure(id, error),
        };
        if tombstone.sync_state != SyncState::Pending {
            return SyncOutcome::Skipped(tombstone.sync_state);
        }

        match self.remote.delete(id).await {
            Ok(()) | Err(Error::Remote(RemoteError::NotFound(_))) => {
                match self.store.purge_tombstone(id).await {
                    Ok(()) => {
                        tracing::info!(entry_id = %id, "Deletion synced");
                        SyncOutcome::Synced
                    }
                    Err(error) => self.store_failure(id, error),
                }
            }
            Err(error) => {
                let classified = self.classifier.classify(error);
                if classified.is_transient() {
                    tracing::warn!(entry_id = %id, error = %classified, "Remote delete failed, will retry");
                    return SyncOutcome::Retry(classified);
                }

                if let Err(store_error) = self
                    .store
                    .update_tombstone_state(id, SyncState::Failed)
                    .await
                {
                    tracing::warn!(entry_id = %id, error = %store_error, "Could not mark deletion failed");
                }
                tracing::error!(entry_id = %id, error = %classified, "Remote delete rejected");
                SyncOutcome::Failed(classified)
            }
        }
    }

    /// Push every pending entry and tombstone.
    ///
    /// Targets are processed one at a time and independently: a failure on one
    /// never stops the others. Cancellation is checked between targets and
    /// interrupts the attempt in flight; rows already processed keep their state.
    pub async fn sync_pending_entries(&self, cancel: &CancellationSignal) -> SyncReport {
        let mut report = SyncReport::default();

        let mut targets = Vec::new();
        match self.store.get_all_by_state(SyncState::Pending).await {
            Ok(entries) => {
                targets.extend(entries.into_iter().map(|entry| (SyncTarget::Entry, entry.id)));
            }
            Err(error) => report.failure = Some(self.classifier.classify(error)),
        }
        match self.store.tombstones_by_state(SyncState::Pending).await {
            Ok(tombstones) => targets.extend(
                tombstones
                    .into_iter()
                    .map(|tombstone| (SyncTarget::Deletion, tombstone.id)),
            ),
            Err(error) => {
                if report.failure.is_none() {
                    report.failure = Some(self.classifier.classify(error));
                }
            }
        }

        for (target, id) in targets {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let attempt = async {
                match target {
                    SyncTarget::Entry => self.sync_entry(&id).await,
                    SyncTarget::Deletion => self.sync_deletion(&id).await,
                }
            };
            let Ok(outcome) = cancel.run_until_cancelled(attempt).await else {
                report.cancelled = true;
                break;
            };
            report.outcomes.push(TargetOutcome {
                id,
                target,
                outcome,
            });
        }

        tracing::info!(
            synced = report.synced(),
            retrying = report.retrying(),
            failed = report.failed(),
            cancelled = report.cancelled,
            "Pushed pending changes"
        );
        report
    }

    /// Merge one remote entry with the upsert-if-newest rule.
    ///
    /// Ids with a local tombstone are skipped so a pending delete is not
    /// undone; the tombstone check and the write share one transaction.
    /// Applied rows are stored as `Synced`.
    pub async fn merge_remote_entry(&self, remote: &Entry) -> Result<MergeOutcome> {
        let mut incoming = remote.clone();
        incoming.sync_state = SyncState::Synced;

        let outcome = self
            .store
            .run_transactional(|tx| {
                if tx.get_tombstone(&incoming.id)?.is_some() {
                    return Ok(MergeOutcome::Tombstoned);
                }
                if tx.upsert_if_newest(&incoming)? {
                    Ok(MergeOutcome::Applied)
                } else {
                    Ok(MergeOutcome::Stale)
                }
            })
            .await?;

        if outcome == MergeOutcome::Tombstoned {
            tracing::debug!(entry_id = %remote.id, "Skipped remote entry with pending delete");
        }
        Ok(outcome)
    }

    /// Fetch every remote document and merge it locally
    pub async fn pull_remote(&self, cancel: &CancellationSignal) -> PullReport {
        let mut report = PullReport::default();

        let documents = match cancel.run_until_cancelled(self.remote.fetch_all()).await {
            Err(_) => {
                report.cancelled = true;
                return report;
            }
            Ok(Ok(documents)) => documents,
            Ok(Err(error)) => {
                let classified = self.classifier.classify(error);
                tracing::warn!(error = %classified, "Fetching remote entries failed");
                report.failure = Some(classified);
                return report;
            }
        };

        for document in documents {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let id = document.id.clone();
            let entry = match Entry::try_from(document) {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!(entry_id = %id, %error, "Skipped invalid remote entry");
                    report.invalid += 1;
                    continue;
                }
            };

            match self.merge_remote_entry(&entry).await {
                Ok(MergeOutcome::Applied) => report.applied += 1,
                Ok(MergeOutcome::Stale) => report.stale += 1,
                Ok(MergeOutcome::Tombstoned) => report.tombstoned += 1,
                Err(error) => {
                    let classified = self.classifier.classify(error);
                    tracing::warn!(entry_id = %id, error = %classified, "Merging remote entry failed");
                    if report.failure.is_none() {
                        report.failure = Some(classified);
                    }
                }
            }
        }

        tracing::info!(
            applied = report.applied,
            stale = report.stale,
            tombstoned = report.tombstoned,
            invalid = report.invalid,
            "Merged remote entries"
        );
        report
    }

    /// Push pending changes, then pull remote ones
    pub async fn sync_all(&self, cancel: &CancellationSignal) -> SyncSummary {
        let push = self.sync_pending_entries(cancel).await;
        let pull = if push.cancelled {
            PullReport {
                cancelled: true,
                ..PullReport::default()
            }
        } else {
            self.pull_remote(cancel).await
        };
        SyncSummary { push, pull }
    }

    /// Delete an entry locally and queue the remote delete.
    ///
    /// The row and its completions go away in the same transaction that
    /// writes the pending tombstone. Deleting an id that only has a tombstone
    /// re-queues it.
    pub async fn delete_entry(&self, id: &EntryId) -> Result<()> {
        let now = self.clock.now_millis();
        self.store
            .run_transactional(|tx| {
                let removed = tx.delete(id)?;
                if !removed && tx.get_tombstone(id)?.is_none() {
                    return Err(Error::NotFound(id.to_string()));
                }
                tx.insert_tombstone(&DeletedEntry {
                    id: id.clone(),
                    deleted_at: now,
                    sync_state: SyncState::Pending,
                })
            })
            .await?;

        tracing::info!(entry_id = %id, "Entry deleted locally");
        Ok(())
    }

    /// Record a completion for `date` and refresh the entry in one transaction.
    ///
    /// Completing an already completed day changes nothing.
    pub async fn mark_entry_done(&self, id: &EntryId, date: NaiveDate) -> Result<Entry> {
        let now = self.clock.now_millis();
        let entry = self
            .store
            .run_transactional(|tx| {
                let entry = require_entry(tx, id)?;
                let recorded = tx.insert_done_entry(&DoneEntry {
                    id: id.clone(),
                    date,
                    done_at: now,
                })?;
                if !recorded {
                    return Ok(entry);
                }
                refresh_completion(tx, &entry, true, now)
            })
            .await?;

        tracing::info!(entry_id = %id, %date, streak = ?streak_of(&entry), "Entry marked done");
        Ok(entry)
    }

    /// Remove the completion for `date` and refresh the entry in one transaction
    pub async fn unmark_entry_done(&self, id: &EntryId, date: NaiveDate) -> Result<Entry> {
        let now = self.clock.now_millis();
        let entry = self
            .store
            .run_transactional(|tx| {
                let entry = require_entry(tx, id)?;
                if !tx.delete_done_entry(id, date)? {
                    return Ok(entry);
                }
                refresh_completion(tx, &entry, false, now)
            })
            .await?;

        tracing::info!(entry_id = %id, %date, "Entry marked not done");
        Ok(entry)
    }

    /// Move a failed entry or tombstone back to `Pending`.
    ///
    /// Returns `false` when the id exists but is not failed.
    pub async fn retry_failed(&self, id: &EntryId) -> Result<bool> {
        let requeued = self
            .store
            .run_transactional(|tx| {
                if let Some(entry) = tx.get_by_id(id)? {
                    if entry.sync_state != SyncState::Failed {
                        return Ok(false);
                    }
                    tx.update_sync_state(id, SyncState::Pending)?;
                    return Ok(true);
                }
                match tx.get_tombstone(id)? {
                    Some(tombstone) if tombstone.sync_state == SyncState::Failed => {
                        tx.update_tombstone_state(id, SyncState::Pending)?;
                        Ok(true)
                    }
                    Some(_) => Ok(false),
                    None => Err(Error::NotFound(id.to_string())),
                }
            })
            .await?;

        if requeued {
            tracing::info!(entry_id = %id, "Failed change queued for retry");
        }
        Ok(requeued)
    }

    /// Set `state` on the stored row if it still matches what was pushed.
    ///
    /// `None` when the row is gone, `Some(false)` when it was edited meanwhile.
    async fn settle(&self, pushed: &Entry, state: SyncState) -> Result<Option<bool>> {
        self.store
            .run_transactional(|tx| {
                let Some(current) = tx.get_by_id(&pushed.id)? else {
                    return Ok(None);
                };
                if current.updated_at != pushed.updated_at {
                    return Ok(Some(false));
                }
                tx.update_sync_state(&pushed.id, state)?;
                Ok(Some(true))
            })
            .await
    }

    fn store_failure(&self, id: &EntryId, error: Error) -> SyncOutcome {
        let classified = self.classifier.classify(error);
        tracing::warn!(entry_id = %id, error = %classified, "Local store failed during sync");
        if classified.is_transient() {
            SyncOutcome::Retry(classified)
        } else {
            SyncOutcome::Failed(classified)
        }
    }
}

fn require_entry(tx: &dyn EntryTransaction, id: &EntryId) -> Result<Entry> {
    tx.get_by_id(id)?
        .ok_or_else(|| Error::NotFound(id.to_string()))
}

/// Recompute completion-derived fields from the done history and write the row
fn refresh_completion(
    tx: &mut dyn EntryTransaction,
    previous: &Entry,
    is_done: bool,
    now: i64,
) -> Result<Entry> {
    let history = tx.done_entries(&previous.id)?;

    let mut entry = stamp_local_write(previous, Some(previous), now);
    entry.is_done = is_done;
    if let EntryKind::Habit {
        recurrence,
        streak_count,
        last_completed_date,
        ..
    } = &mut entry.kind
    {
        let dates: Vec<NaiveDate> = history.iter().map(|done| done.date).collect();
        *streak_count = Some(compute_streak(*recurrence, &dates));
        *last_completed_date = history
            .iter()
            .max_by_key(|done| done.date)
            .map(|done| done.done_at);
    }

    tx.insert_or_replace(&entry)?;
    Ok(entry)
}

const fn streak_of(entry: &Entry) -> Option<u32> {
    match entry.kind {
        EntryKind::Habit { streak_count, .. } => streak_count,
        EntryKind::Task { .. } => None,
    }
}
