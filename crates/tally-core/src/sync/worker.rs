//! Background sync driven by write triggers and a fixed interval

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::db::EntryStore;
use crate::models::EntryId;
use crate::remote::RemoteEntryApi;

use super::cancel::CancellationSignal;
use super::engine::SyncEngine;

/// Work queued for the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    /// Push one entry
    Entry(EntryId),
    /// Push one tombstone
    Deletion(EntryId),
    /// Push everything pending, then pull
    All,
}

/// Sending half handed to the repository
#[derive(Debug, Clone)]
pub struct SyncTrigger {
    sender: mpsc::UnboundedSender<SyncRequest>,
}

impl SyncTrigger {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue a request; returns `false` once the worker is gone
    pub fn request(&self, request: SyncRequest) -> bool {
        self.sender.send(request).is_ok()
    }
}

/// Drains sync requests and runs a full sync on every interval tick
pub struct SyncWorker<S, R> {
    engine: Arc<SyncEngine<S, R>>,
    requests: mpsc::UnboundedReceiver<SyncRequest>,
    interval: Duration,
}

impl<S: EntryStore, R: RemoteEntryApi> SyncWorker<S, R> {
    pub fn new(
        engine: Arc<SyncEngine<S, R>>,
        requests: mpsc::UnboundedReceiver<SyncRequest>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            requests,
            interval,
        }
    }

    /// Run until `cancel` fires.
    ///
    /// The first interval tick fires immediately. Once every trigger is
    /// dropped the worker keeps running on the interval alone.
    pub async fn run(mut self, cancel: CancellationSignal) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut requests_open = true;

        tracing::info!(interval_secs = self.interval.as_secs(), "Sync worker started");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                request = self.requests.recv(), if requests_open => match request {
                    Some(request) => self.handle(request, &cancel).await,
                    None => requests_open = false,
                },
                _ = ticker.tick() => {
                    let summary = self.engine.sync_all(&cancel).await;
                    tracing::debug!(
                        pushed = summary.push.synced(),
                        pulled = summary.pull.applied,
                        "Periodic sync finished"
                    );
                }
            }
        }
        tracing::info!("Sync worker stopped");
    }

    async fn handle(&self, request: SyncRequest, cancel: &CancellationSignal) {
        tracing::debug!(?request, "Handling sync request");
        let work = async {
            match request {
                SyncRequest::Entry(id) => {
                    self.engine.sync_entry(&id).await;
                }
                SyncRequest::Deletion(id) => {
                    self.engine.sync_deletion(&id).await;
                }
                SyncRequest::All => {
                    self.engine.sync_all(cancel).await;
                }
            }
        };
        if let Err(error) = cancel.run_until_cancelled(work).await {
            tracing::info!(%error, "Sync request interrupted");
        }
    }
}
