//! Entry model: tasks and habits

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// A unique identifier for an entry.
///
/// Locally created ids are UUID v7 (time-sortable); ids arriving from the
/// remote store are accepted as any non-blank string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Create a new unique entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("entry id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Discriminator for the concrete entry variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Task,
    Habit,
}

impl EntryType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Habit => "habit",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "habit" => Ok(Self::Habit),
            other => Err(Error::InvalidInput(format!("unknown entry type: {other}"))),
        }
    }
}

/// How often a habit repeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Custom,
    #[default]
    None,
}

impl Recurrence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Custom => "custom",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "custom" => Ok(Self::Custom),
            "none" | "" => Ok(Self::None),
            other => Err(Error::InvalidInput(format!("unknown recurrence: {other}"))),
        }
    }
}

/// Per-row synchronization status.
///
/// `Pending` rows are pushed by the sync engine, `Synced` rows match the
/// remote copy, `Failed` rows hit a permanent failure and wait for an explicit
/// retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Pending,
    Synced,
    Failed,
}

impl SyncState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "failed" => Ok(Self::Failed),
            other => Err(Error::InvalidInput(format!("unknown sync state: {other}"))),
        }
    }
}

/// Variant-specific entry fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryKind {
    Task {
        due_date: NaiveDate,
    },
    Habit {
        recurrence: Recurrence,
        streak_count: Option<u32>,
        /// Unix ms of the most recent completion
        last_completed_date: Option<i64>,
        start_date: NaiveDate,
    },
}

/// A task or habit owned by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier, immutable
    pub id: EntryId,
    pub title: String,
    pub description: String,
    pub is_done: bool,
    /// Optional time of day, drives reminders
    pub time: Option<NaiveTime>,
    /// Creation timestamp (Unix ms), immutable once stored
    pub created_at: i64,
    /// Last update timestamp (Unix ms) used for last-writer-wins merges
    pub updated_at: Option<i64>,
    pub sync_state: SyncState,
    pub kind: EntryKind,
}

impl Entry {
    /// Create a new task due on `due_date`
    #[must_use]
    pub fn task(title: impl Into<String>, due_date: NaiveDate, now_millis: i64) -> Self {
        Self::with_kind(title, EntryKind::Task { due_date }, now_millis)
    }

    /// Create a new habit starting on `start_date`
    #[must_use]
    pub fn habit(
        title: impl Into<String>,
        recurrence: Recurrence,
        start_date: NaiveDate,
        now_millis: i64,
    ) -> Self {
        Self::with_kind(
            title,
            EntryKind::Habit {
                recurrence,
                streak_count: None,
                last_completed_date: None,
                start_date,
            },
            now_millis,
        )
    }

    fn with_kind(title: impl Into<String>, kind: EntryKind, now_millis: i64) -> Self {
        Self {
            id: EntryId::new(),
            title: title.into(),
            description: String::new(),
            is_done: false,
            time: None,
            created_at: now_millis,
            updated_at: Some(now_millis),
            sync_state: SyncState::Pending,
            kind,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub const fn with_time(mut self, time: NaiveTime) -> Self {
        self.time = Some(time);
        self
    }

    pub const fn entry_type(&self) -> EntryType {
        match self.kind {
            EntryKind::Task { .. } => EntryType::Task,
            EntryKind::Habit { .. } => EntryType::Habit,
        }
    }

    pub const fn is_habit(&self) -> bool {
        matches!(self.kind, EntryKind::Habit { .. })
    }

    pub const fn due_date(&self) -> Option<NaiveDate> {
        match self.kind {
            EntryKind::Task { due_date } => Some(due_date),
            EntryKind::Habit { .. } => None,
        }
    }

    pub const fn recurrence(&self) -> Option<Recurrence> {
        match self.kind {
            EntryKind::Habit { recurrence, .. } => Some(recurrence),
            EntryKind::Task { .. } => None,
        }
    }

    /// Update timestamp with a missing value treated as the epoch.
    pub fn updated_at_or_epoch(&self) -> i64 {
        self.updated_at.unwrap_or(0)
    }

    /// Whether the entry shows up on the given calendar day.
    ///
    /// Tasks appear on their due date. Habits appear from their start date:
    /// daily and custom habits every day, weekly habits on the start date's
    /// weekday, and non-recurring habits only on the start date.
    pub fn is_visible_on(&self, date: NaiveDate) -> bool {
        match self.kind {
            EntryKind::Task { due_date } => due_date == date,
            EntryKind::Habit {
                recurrence,
                start_date,
                ..
            } => {
                date >= start_date
                    && match recurrence {
                        Recurrence::Daily | Recurrence::Custom => true,
                        Recurrence::Weekly => date.weekday() == start_date.weekday(),
                        Recurrence::None => date == start_date,
                    }
            }
        }
    }
}
