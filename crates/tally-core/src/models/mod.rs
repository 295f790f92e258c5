//! Data models for Tally

mod done;
mod entry;
mod sync_conflict;

pub use done::{compute_streak, DeletedEntry, DoneEntry};
pub use entry::{Entry, EntryId, EntryKind, EntryType, Recurrence, SyncState};
pub use sync_conflict::SyncConflict;
