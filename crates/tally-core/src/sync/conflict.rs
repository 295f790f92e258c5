//! Last-writer-wins ("upsert if newest") conflict policy.

use crate::models::Entry;

/// Strategy name recorded with rejected writes.
pub const LWW_STRATEGY: &str = "lww";

/// Result of comparing an incoming entry against the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing stored under this id yet
    Insert,
    /// Incoming entry is strictly newer and replaces the stored one
    Replace,
    /// Same timestamp, stored row is kept
    KeepTie,
    /// Incoming entry is older, stored row is kept
    KeepStale,
}

impl Resolution {
    pub const fn applies(self) -> bool {
        matches!(self, Self::Insert | Self::Replace)
    }
}

/// Decide whether `candidate` may overwrite `current`.
///
/// Missing `updated_at` values compare as the epoch, so a timestamp-less
/// candidate never beats a stored row that has one. Equal timestamps keep the
/// stored row, which makes repeated application of the same update a no-op.
pub fn resolve(candidate: &Entry, current: Option<&Entry>) -> Resolution {
    let Some(current) = current else {
        return Resolution::Insert;
    };

    let incoming = candidate.updated_at_or_epoch();
    let stored = current.updated_at_or_epoch();
    match incoming.cmp(&stored) {
        std::cmp::Ordering::Greater => Resolution::Replace,
        std::cmp::Ordering::Equal => Resolution::KeepTie,
        std::cmp::Ordering::Less => Resolution::KeepStale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task_at(updated_at: Option<i64>) -> Entry {
        let mut task = Entry::task("t", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), 1);
        task.updated_at = updated_at;
        task
    }

    #[test]
    fn inserts_when_nothing_stored() {
        assert_eq!(resolve(&task_at(None), None), Resolution::Insert);
    }

    #[test]
    fn newer_candidate_replaces() {
        let current = task_at(Some(10));
        assert_eq!(resolve(&task_at(Some(11)), Some(&current)), Resolution::Replace);
    }

    #[test]
    fn older_candidate_is_stale() {
        let current = task_at(Some(10));
        assert_eq!(resolve(&task_at(Some(9)), Some(&current)), Resolution::KeepStale);
    }

    #[test]
    fn tie_keeps_existing() {
        let current = task_at(Some(10));
        assert_eq!(resolve(&task_at(Some(10)), Some(&current)), Resolution::KeepTie);
        assert!(!resolve(&task_at(Some(10)), Some(&current)).applies());
    }

    #[test]
    fn missing_timestamp_never_beats_concrete_one() {
        let current = task_at(Some(1));
        assert!(!resolve(&task_at(None), Some(&current)).applies());
        assert!(resolve(&task_at(Some(1)), Some(&task_at(None))).applies());
    }
}
