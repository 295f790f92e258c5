//! Sync conflict model

use serde::{Deserialize, Serialize};

/// Incoming write rejected by the last-writer-wins rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Entry involved in the conflict
    pub entry_id: String,
    /// Stored row's timestamp when the conflict occurred
    pub local_updated_at: i64,
    /// Incoming row's timestamp that was rejected
    pub incoming_updated_at: i64,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
    /// Resolution strategy name
    pub strategy: String,
}
