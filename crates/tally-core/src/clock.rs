//! Time source abstraction.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

/// Supplies the current time to the store decorator, sync engine and reminders.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current instant as Unix milliseconds.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Current wall-clock date and time, used for time-of-day reminders.
    fn local_now(&self) -> NaiveDateTime {
        self.now().naive_utc()
    }

    /// Current calendar day.
    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

/// System clock using the machine's local timezone for wall-clock values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
