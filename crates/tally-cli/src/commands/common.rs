use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tally_core::clock::{Clock, SystemClock};
use tally_core::config::RemoteConfig;
use tally_core::models::{DoneEntry, EntryKind, SyncConflict};
use tally_core::reminder::TracingReminderScheduler;
use tally_core::remote::{EntryRepresentation, HttpRemoteEntryApi, RemoteEntryApi};
use tally_core::services::{open_tracked_store, EntryRepository, TrackedStore};
use tally_core::sync::SyncEngine;
use tally_core::util::collapse_whitespace;
use tally_core::{Entry, EntryId, RemoteError};

use crate::config::{resolve_db_path, CliConfig, ENV_DB_PATH};
use crate::error::CliError;

/// Remote used by the CLI; `Disabled` when nothing is configured
pub enum CliRemote {
    Http(HttpRemoteEntryApi),
    Disabled,
}

impl CliRemote {
    fn disabled() -> tally_core::Error {
        RemoteError::Connectivity("remote is not configured".to_string()).into()
    }
}

impl RemoteEntryApi for CliRemote {
    async fn push(&self, entry: &Entry) -> tally_core::Result<()> {
        match self {
            Self::Http(api) => api.push(entry).await,
            Self::Disabled => Err(Self::disabled()),
        }
    }

    async fn fetch_all(&self) -> tally_core::Result<Vec<EntryRepresentation>> {
        match self {
            Self::Http(api) => api.fetch_all().await,
            Self::Disabled => Err(Self::disabled()),
        }
    }

    async fn delete(&self, id: &EntryId) -> tally_core::Result<()> {
        match self {
            Self::Http(api) => api.delete(id).await,
            Self::Disabled => Err(Self::disabled()),
        }
    }
}

pub type CliRepository = EntryRepository<TrackedStore, CliRemote>;

/// Resolved paths and settings shared by every command
pub struct CliContext {
    pub db_path: PathBuf,
    pub config: CliConfig,
    pub remote: Option<RemoteConfig>,
}

impl CliContext {
    pub fn resolve(
        cli_db_path: Option<PathBuf>,
        config_path: &Path,
    ) -> Result<Self, CliError> {
        let config = CliConfig::load_from_path(config_path)?;
        let env_db_path = std::env::var_os(ENV_DB_PATH).map(PathBuf::from);
        let db_path = resolve_db_path(cli_db_path, env_db_path, &config);
        let remote = config.remote_config(|key| std::env::var(key).ok())?;
        Ok(Self {
            db_path,
            config,
            remote,
        })
    }

    pub fn open_repository(&self) -> Result<CliRepository, CliError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = open_tracked_store(&self.db_path, clock.clone())?;
        let remote = match &self.remote {
            Some(config) => CliRemote::Http(HttpRemoteEntryApi::new(config.clone())?),
            None => CliRemote::Disabled,
        };
        let engine = Arc::new(SyncEngine::new(store, remote, clock));
        Ok(EntryRepository::new(
            engine,
            Arc::new(TracingReminderScheduler),
        ))
    }
}

pub fn today() -> NaiveDate {
    SystemClock.today()
}

pub fn normalize_title(parts: &[String]) -> Result<String, CliError> {
    let title = collapse_whitespace(&parts.join(" "));
    if title.is_empty() {
        Err(CliError::EmptyTitle)
    } else {
        Ok(title)
    }
}

pub fn normalize_entry_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyEntryId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Pick the single id matching `query` exactly or by prefix
pub fn match_entry_id<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a EntryId>,
) -> Result<EntryId, CliError> {
    let mut matches: Vec<&EntryId> = Vec::new();
    for id in candidates {
        if id.as_str() == query {
            return Ok(id.clone());
        }
        if id.as_str().starts_with(query) && !matches.contains(&id) {
            matches.push(id);
        }
    }

    match matches.as_slice() {
        [] => Err(CliError::EntryNotFound(query.to_string())),
        [id] => Ok((*id).clone()),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousEntryId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Resolve an id or prefix against live entries
pub async fn resolve_entry(query: &str, repo: &CliRepository) -> Result<Entry, CliError> {
    let query = normalize_entry_identifier(query)?;
    if let Ok(id) = query.parse::<EntryId>() {
        if let Some(entry) = repo.get_entry(&id).await? {
            return Ok(entry);
        }
    }

    let mut entries = repo.get_tasks().await?;
    entries.extend(repo.get_habits().await?);
    let id = match_entry_id(&query, entries.iter().map(|entry| &entry.id))?;
    entries
        .into_iter()
        .find(|entry| entry.id == id)
        .ok_or(CliError::EntryNotFound(query))
}

pub fn short_id(id: &EntryId) -> String {
    id.as_str().chars().take(13).collect()
}

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub title: String,
    pub description: String,
    pub is_done: bool,
    pub time: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub recurrence: Option<String>,
    pub streak_count: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub sync_state: String,
}

pub fn entry_to_list_item(entry: &Entry) -> EntryListItem {
    let (due_date, recurrence, streak_count, start_date) = match &entry.kind {
        EntryKind::Task { due_date } => (Some(*due_date), None, None, None),
        EntryKind::Habit {
            recurrence,
            streak_count,
            start_date,
            ..
        } => (
            None,
            Some(recurrence.to_string()),
            *streak_count,
            Some(*start_date),
        ),
    };

    EntryListItem {
        id: entry.id.to_string(),
        entry_type: entry.entry_type().to_string(),
        title: entry.title.clone(),
        description: entry.description.clone(),
        is_done: entry.is_done,
        time: entry.time.map(|time| time.format("%H:%M").to_string()),
        due_date,
        recurrence,
        streak_count,
        start_date,
        created_at: entry.created_at,
        updated_at: entry.updated_at,
        sync_state: entry.sync_state.to_string(),
    }
}

pub fn format_entry_lines(entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let check = if entry.is_done { "[x]" } else { "[ ]" };
            let time = entry
                .time
                .map_or_else(|| "     ".to_string(), |time| time.format("%H:%M").to_string());
            let title = truncate(&entry.title, 40);
            format!(
                "{:<13}  {check} {time}  {title:<40}  {}  {}",
                short_id(&entry.id),
                entry_detail(entry),
                entry.sync_state
            )
        })
        .collect()
}

fn entry_detail(entry: &Entry) -> String {
    match &entry.kind {
        EntryKind::Task { due_date } => format!("due {due_date}"),
        EntryKind::Habit {
            recurrence,
            streak_count,
            ..
        } => format!("{recurrence} streak {}", streak_count.unwrap_or(0)),
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let mut truncated = collapsed
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_done_lines(history: &[DoneEntry]) -> Vec<String> {
    history
        .iter()
        .map(|done| format!("{}  at {}", done.date, format_timestamp(done.done_at)))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub entry_id: String,
    pub local_updated_at: i64,
    pub incoming_updated_at: i64,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub strategy: String,
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        entry_id: conflict.entry_id.clone(),
        local_updated_at: conflict.local_updated_at,
        incoming_updated_at: conflict.incoming_updated_at,
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_timestamp(conflict.resolved_at),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<4}  entry={}  local={} incoming={}",
                format_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.entry_id,
                conflict.local_updated_at,
                conflict.incoming_updated_at
            )
        })
        .collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
