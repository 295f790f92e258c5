//! Reminder scheduling requests.
//!
//! The core decides when an entry should remind the user; delivery belongs to
//! whatever implements [`ReminderScheduler`].

use std::time::Duration;

use chrono::{Days, NaiveDateTime};

use crate::models::{Entry, EntryId, EntryKind, Recurrence};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Platform capability that delivers reminders
pub trait ReminderScheduler: Send + Sync {
    /// Schedule (or reschedule) the reminder for `entry_id`
    fn schedule_reminder(&self, entry_id: &EntryId, delay: Duration, interval: Option<Duration>);

    fn cancel_reminder(&self, entry_id: &EntryId);
}

/// Scheduler that only logs requests
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReminderScheduler;

impl ReminderScheduler for TracingReminderScheduler {
    fn schedule_reminder(&self, entry_id: &EntryId, delay: Duration, interval: Option<Duration>) {
        tracing::info!(
            entry_id = %entry_id,
            delay_secs = delay.as_secs(),
            interval_secs = interval.map(|interval| interval.as_secs()),
            "Reminder scheduled"
        );
    }

    fn cancel_reminder(&self, entry_id: &EntryId) {
        tracing::info!(entry_id = %entry_id, "Reminder cancelled");
    }
}

/// When an entry's reminder fires and how often it repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPlan {
    pub delay: Duration,
    pub interval: Option<Duration>,
}

/// Compute the reminder for `entry` relative to the wall-clock `now`.
///
/// Only entries with a time of day remind. Tasks fire once at their due date
/// and time, and not at all once done or past. Habits fire at their next
/// visible occurrence and repeat daily or weekly to match their recurrence.
pub fn reminder_plan(entry: &Entry, now: NaiveDateTime) -> Option<ReminderPlan> {
    let time = entry.time?;

    match entry.kind {
        EntryKind::Task { due_date } => {
            if entry.is_done {
                return None;
            }
            let delay = (due_date.and_time(time) - now).to_std().ok()?;
            (!delay.is_zero()).then_some(ReminderPlan {
                delay,
                interval: None,
            })
        }
        EntryKind::Habit {
            recurrence,
            start_date,
            ..
        } => {
            if recurrence == Recurrence::None && entry.is_done {
                return None;
            }
            let first = start_date.max(now.date());
            let fire_at = (0..=7)
                .filter_map(|offset| first.checked_add_days(Days::new(offset)))
                .filter(|date| entry.is_visible_on(*date))
                .map(|date| date.and_time(time))
                .find(|fire_at| *fire_at > now)?;

            let interval = match recurrence {
                Recurrence::Daily => Some(DAY),
                Recurrence::Weekly => Some(DAY * 7),
                Recurrence::Custom | Recurrence::None => None,
            };
            Some(ReminderPlan {
                delay: (fire_at - now).to_std().ok()?,
                interval,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        day.and_hms_opt(h, m, 0).unwrap()
    }

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn task_without_time_has_no_reminder() {
        let task = Entry::task("t", date(2026, 3, 2), 0);
        assert_eq!(reminder_plan(&task, at(date(2026, 3, 1), 8, 0)), None);
    }

    #[test]
    fn task_fires_at_due_time() {
        let task = Entry::task("t", date(2026, 3, 2), 0).with_time(nine());
        let plan = reminder_plan(&task, at(date(2026, 3, 1), 9, 0)).unwrap();
        assert_eq!(plan.delay, DAY);
        assert_eq!(plan.interval, None);
    }

    #[test]
    fn past_or_done_task_has_no_reminder() {
        let task = Entry::task("t", date(2026, 3, 1), 0).with_time(nine());
        assert_eq!(reminder_plan(&task, at(date(2026, 3, 1), 10, 0)), None);

        let mut done = Entry::task("t", date(2026, 3, 2), 0).with_time(nine());
        done.is_done = true;
        assert_eq!(reminder_plan(&done, at(date(2026, 3, 1), 8, 0)), None);
    }

    #[test]
    fn daily_habit_fires_tomorrow_after_todays_time() {
        let habit =
            Entry::habit("h", Recurrence::Daily, date(2026, 3, 1), 0).with_time(nine());
        let plan = reminder_plan(&habit, at(date(2026, 3, 5), 10, 0)).unwrap();
        assert_eq!(plan.delay, Duration::from_secs(23 * 60 * 60));
        assert_eq!(plan.interval, Some(DAY));
    }

    #[test]
    fn weekly_habit_waits_for_its_weekday() {
        // 2026-03-02 is a Monday
        let habit =
            Entry::habit("h", Recurrence::Weekly, date(2026, 3, 2), 0).with_time(nine());
        let plan = reminder_plan(&habit, at(date(2026, 3, 4), 9, 0)).unwrap();
        assert_eq!(plan.delay, DAY * 5);
        assert_eq!(plan.interval, Some(DAY * 7));
    }

    #[test]
    fn future_habit_starts_at_start_date() {
        let habit =
            Entry::habit("h", Recurrence::Custom, date(2026, 4, 1), 0).with_time(nine());
        let plan = reminder_plan(&habit, at(date(2026, 3, 1), 9, 0)).unwrap();
        assert_eq!(plan.delay, DAY * 31);
        assert_eq!(plan.interval, None);
    }

    #[test]
    fn one_off_habit_in_the_past_has_no_reminder() {
        let habit = Entry::habit("h", Recurrence::None, date(2026, 3, 1), 0).with_time(nine());
        assert_eq!(reminder_plan(&habit, at(date(2026, 3, 2), 8, 0)), None);
    }
}
