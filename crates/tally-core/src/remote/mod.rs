//! Remote entry store contract and its document representation

mod http;

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, RemoteError, Result};
use crate::models::{Entry, EntryId, EntryKind, EntryType, Recurrence, SyncState};

pub use http::HttpRemoteEntryApi;

/// Remote document store holding the authoritative remote copy of entries
#[allow(async_fn_in_trait)]
pub trait RemoteEntryApi {
    /// Create or replace the remote copy of `entry`
    async fn push(&self, entry: &Entry) -> Result<()>;

    /// Fetch every remote entry document
    async fn fetch_all(&self) -> Result<Vec<EntryRepresentation>>;

    /// Delete the remote copy of an entry
    async fn delete(&self, id: &EntryId) -> Result<()>;
}

/// Entry document as stored remotely.
///
/// Mirrors [`Entry`] plus the server-assigned timestamps. Every field other
/// than `id` and `type` may be missing; converting into an [`Entry`] fills defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRepresentation {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing)]
    pub server_created_at: Option<i64>,
    #[serde(default, skip_serializing)]
    pub server_updated_at: Option<i64>,
}

impl From<&Entry> for EntryRepresentation {
    fn from(entry: &Entry) -> Self {
        let mut representation = Self {
            id: entry.id.as_str().to_string(),
            entry_type: entry.entry_type().as_str().to_string(),
            title: entry.title.clone(),
            description: Some(entry.description.clone()),
            is_done: Some(entry.is_done),
            time: entry.time,
            created_at: Some(entry.created_at),
            updated_at: entry.updated_at,
            due_date: None,
            recurrence: None,
            streak_count: None,
            last_completed_date: None,
            start_date: None,
            server_created_at: None,
            server_updated_at: None,
        };

        match &entry.kind {
            EntryKind::Task { due_date } => representation.due_date = Some(*due_date),
            EntryKind::Habit {
                recurrence,
                streak_count,
                last_completed_date,
                start_date,
            } => {
                representation.recurrence = Some(recurrence.as_str().to_string());
                representation.streak_count = *streak_count;
                representation.last_completed_date = *last_completed_date;
                representation.start_date = Some(*start_date);
            }
        }

        representation
    }
}

impl TryFrom<EntryRepresentation> for Entry {
    type Error = Error;

    /// Convert a remote document into a local entry in the `Synced` state.
    ///
    /// Missing description is empty, missing done flag is `false`, missing
    /// recurrence is `None`, missing `createdAt` falls back to the server
    /// timestamps and a missing habit start date to the creation day. A task
    /// without a due date or an unknown type is malformed.
    fn try_from(value: EntryRepresentation) -> Result<Self> {
        let id: EntryId = value.id.parse().map_err(|_| malformed("blank id"))?;
        let entry_type: EntryType = value
            .entry_type
            .parse()
            .map_err(|_| malformed(format!("unknown entry type '{}' for {id}", value.entry_type)))?;

        let created_at = value
            .created_at
            .or(value.server_created_at)
            .or(value.server_updated_at)
            .unwrap_or(0);

        let kind = match entry_type {
            EntryType::Task => EntryKind::Task {
                due_date: value
                    .due_date
                    .ok_or_else(|| malformed(format!("task {id} has no due date")))?,
            },
            EntryType::Habit => {
                let recurrence = match value.recurrence.as_deref() {
                    None => Recurrence::None,
                    Some(raw) => raw
                        .parse()
                        .map_err(|_| malformed(format!("unknown recurrence '{raw}' for {id}")))?,
                };
                let start_date = match value.start_date {
                    Some(start_date) => start_date,
                    None => DateTime::from_timestamp_millis(created_at)
                        .map(|created| created.date_naive())
                        .ok_or_else(|| malformed(format!("habit {id} has no start date")))?,
                };
                EntryKind::Habit {
                    recurrence,
                    streak_count: value.streak_count,
                    last_completed_date: value.last_completed_date,
                    start_date,
                }
            }
        };

        Ok(Self {
            id,
            title: value.title,
            description: value.description.unwrap_or_default(),
            is_done: value.is_done.unwrap_or(false),
            time: value.time,
            created_at,
            updated_at: value.updated_at,
            sync_state: SyncState::Synced,
            kind,
        })
    }
}

fn malformed(message: impl Into<String>) -> Error {
    Error::Remote(RemoteError::Malformed(message.into()))
}
