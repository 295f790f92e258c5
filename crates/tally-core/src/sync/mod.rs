//! Entry synchronization with the remote store

mod cancel;
mod classifier;
pub mod conflict;
mod engine;
mod worker;

pub use cancel::{cancellation, CancellationHandle, CancellationSignal};
pub use classifier::{
    DatabaseErrorClassifier, ErrorClassifier, ErrorType, NetworkErrorClassifier,
    SyncErrorClassifier,
};
pub use conflict::{resolve, Resolution, LWW_STRATEGY};
pub use engine::{
    MergeOutcome, PullReport, SyncEngine, SyncOutcome, SyncReport, SyncSummary, SyncTarget,
    TargetOutcome,
};
pub use worker::{SyncRequest, SyncTrigger, SyncWorker};
