//! Live queries over the local store

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::error::Result;
use crate::models::{Entry, SyncState};

use super::store::EntryStore;

/// What a live stream re-runs on every change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveQuery {
    VisibleOn(NaiveDate),
    Pending,
}

/// A live sequence of query results.
///
/// The first call to [`EntryStream::next`] yields the current snapshot; each
/// later call waits for the next committed write and yields a fresh snapshot.
/// Several writes between two calls collapse into one snapshot.
pub struct EntryStream<S> {
    store: S,
    query: LiveQuery,
    changes: watch::Receiver<u64>,
    primed: bool,
}

impl<S: EntryStore> EntryStream<S> {
    pub fn new(store: S, query: LiveQuery) -> Self {
        let changes = store.subscribe();
        Self {
            store,
            query,
            changes,
            primed: false,
        }
    }

    /// Wait for the next snapshot; `None` once the change feed is closed
    pub async fn next(&mut self) -> Option<Result<Vec<Entry>>> {
        if self.primed {
            if self.changes.changed().await.is_err() {
                return None;
            }
        } else {
            self.primed = true;
            let _seen = *self.changes.borrow_and_update();
        }

        Some(self.snapshot().await)
    }

    async fn snapshot(&self) -> Result<Vec<Entry>> {
        match self.query {
            LiveQuery::VisibleOn(date) => self.store.visible_on(date).await,
            LiveQuery::Pending => self.store.get_all_by_state(SyncState::Pending).await,
        }
    }
}
