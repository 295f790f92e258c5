//! Completion history and deletion tombstones

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::entry::{EntryId, Recurrence, SyncState};

/// A single completion of an entry on a calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoneEntry {
    /// Parent entry id
    pub id: EntryId,
    /// Day the completion applies to
    pub date: NaiveDate,
    /// When the completion was recorded (Unix ms)
    pub done_at: i64,
}

/// Deletion marker kept until the remote delete is confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEntry {
    pub id: EntryId,
    /// Deletion timestamp (Unix ms)
    pub deleted_at: i64,
    pub sync_state: SyncState,
}

/// Count consecutive completion periods ending at the most recent completion.
///
/// Weekly habits count consecutive ISO weeks (Monday start); everything else
/// counts consecutive days. Multiple completions inside one period count once.
pub fn compute_streak(recurrence: Recurrence, completions: &[NaiveDate]) -> u32 {
    let mut periods: Vec<i64> = completions
        .iter()
        .map(|date| period_index(recurrence, *date))
        .collect();
    periods.sort_unstable_by(|a, b| b.cmp(a));
    periods.dedup();

    let Some(&latest) = periods.first() else {
        return 0;
    };

    let mut streak = 1;
    let mut expected = latest - 1;
    for period in periods.iter().skip(1) {
        if *period != expected {
            break;
        }
        streak += 1;
        expected -= 1;
    }
    streak
}

fn period_index(recurrence: Recurrence, date: NaiveDate) -> i64 {
    // Day 1 of the common era is a Monday.
    let day = i64::from(date.num_days_from_ce()) - 1;
    match recurrence {
        Recurrence::Weekly => day.div_euclid(7),
        Recurrence::Daily | Recurrence::Custom | Recurrence::None => day,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_history_has_no_streak() {
        assert_eq!(compute_streak(Recurrence::Daily, &[]), 0);
    }

    #[test]
    fn daily_streak_counts_consecutive_days() {
        let history = [date(2026, 3, 3), date(2026, 3, 1), date(2026, 3, 2)];
        assert_eq!(compute_streak(Recurrence::Daily, &history), 3);
    }

    #[test]
    fn daily_streak_breaks_on_gap() {
        let history = [date(2026, 3, 1), date(2026, 3, 3), date(2026, 3, 4)];
        assert_eq!(compute_streak(Recurrence::Daily, &history), 2);
    }

    #[test]
    fn weekly_streak_counts_iso_weeks() {
        // Tue of one week, Mon of the next, Sun of the one after.
        let history = [date(2026, 3, 3), date(2026, 3, 9), date(2026, 3, 22)];
        assert_eq!(compute_streak(Recurrence::Weekly, &history), 3);

        let broken = [date(2026, 3, 3), date(2026, 3, 17)];
        assert_eq!(compute_streak(Recurrence::Weekly, &broken), 1);
    }

    #[test]
    fn duplicate_days_count_once() {
        let history = [date(2026, 3, 2), date(2026, 3, 2)];
        assert_eq!(compute_streak(Recurrence::Daily, &history), 1);
    }
}
