//! SQL for entries, completions, tombstones and conflicts.
//!
//! Every function takes a plain `&Connection` so the same code runs against
//! an open connection and inside a transaction.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use std::collections::HashSet;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::models::{
    DeletedEntry, DoneEntry, Entry, EntryId, EntryKind, EntryType, Recurrence, SyncConflict,
    SyncState,
};
use crate::sync::conflict::{resolve, Resolution, LWW_STRATEGY};

const ENTRY_COLUMNS: &str = "id, entry_type, title, description, is_done, time, created_at, \
     updated_at, due_date, recurrence, streak_count, last_completed_date, start_date, sync_state";

const ENTRY_ORDER: &str = "ORDER BY time IS NULL, time ASC, created_at ASC";

macro_rules! text_enum_sql {
    ($($ty:ty),*) => {$(
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
            }
        }
    )*};
}

text_enum_sql!(EntryType, Recurrence, SyncState, EntryId);

/// Outcome of a conflict-aware upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Applied,
    Ignored(Resolution),
}

/// Parse an entry from a row selected with `ENTRY_COLUMNS`
fn parse_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let entry_type: EntryType = row.get(1)?;
    let kind = match entry_type {
        EntryType::Task => EntryKind::Task {
            due_date: row.get(8)?,
        },
        EntryType::Habit => EntryKind::Habit {
            recurrence: row.get::<_, Option<Recurrence>>(9)?.unwrap_or_default(),
            streak_count: row.get(10)?,
            last_completed_date: row.get(11)?,
            start_date: row.get(12)?,
        },
    };

    Ok(Entry {
        id: row.get(0)?,
        title: row.get(2)?,
        description: row.get(3)?,
        is_done: row.get(4)?,
        time: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        sync_state: row.get(13)?,
        kind,
    })
}

fn parse_tombstone(row: &Row<'_>) -> rusqlite::Result<DeletedEntry> {
    Ok(DeletedEntry {
        id: row.get(0)?,
        deleted_at: row.get(1)?,
        sync_state: row.get(2)?,
    })
}

fn parse_done(row: &Row<'_>) -> rusqlite::Result<DoneEntry> {
    Ok(DoneEntry {
        id: row.get(0)?,
        date: row.get(1)?,
        done_at: row.get(2)?,
    })
}

fn query_entries(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Entry>> {
    let mut stmt = conn.prepare(sql)?;
    let entries = stmt
        .query_map(params, parse_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

pub fn get_entry(conn: &Connection, id: &EntryId) -> Result<Option<Entry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?"),
            params![id],
            parse_entry,
        )
        .optional()?;
    Ok(entry)
}

pub fn list_by_type(conn: &Connection, entry_type: EntryType) -> Result<Vec<Entry>> {
    query_entries(
        conn,
        &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE entry_type = ? {ENTRY_ORDER}"),
        params![entry_type],
    )
}

pub fn list_by_state(conn: &Connection, state: SyncState) -> Result<Vec<Entry>> {
    query_entries(
        conn,
        &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE sync_state = ? ORDER BY updated_at ASC"),
        params![state],
    )
}

/// Entries visible on `date`, with habit done flags reflecting that day's
/// completion history.
pub fn list_visible_on(conn: &Connection, date: NaiveDate) -> Result<Vec<Entry>> {
    let candidates = query_entries(
        conn,
        &format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE (entry_type = 'task' AND due_date = ?1)
                OR (entry_type = 'habit' AND start_date <= ?1)
             {ENTRY_ORDER}"
        ),
        params![date],
    )?;

    let mut stmt = conn.prepare("SELECT id FROM done_entries WHERE date = ?")?;
    let done_ids = stmt
        .query_map(params![date], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;

    Ok(candidates
        .into_iter()
        .filter(|entry| entry.is_visible_on(date))
        .map(|mut entry| {
            if entry.is_habit() {
                entry.is_done = done_ids.contains(entry.id.as_str());
            }
            entry
        })
        .collect())
}

/// Reject writes that would change an id's variant; returns the stored row.
fn check_variant(conn: &Connection, entry: &Entry) -> Result<Option<Entry>> {
    let current = get_entry(conn, &entry.id)?;
    if let Some(current) = &current {
        if current.entry_type() != entry.entry_type() {
            return Err(Error::InvalidInput(format!(
                "entry {} is a {} and cannot become a {}",
                entry.id,
                current.entry_type(),
                entry.entry_type()
            )));
        }
    }
    Ok(current)
}

fn write_row(conn: &Connection, entry: &Entry) -> Result<()> {
    let (due_date, recurrence, streak_count, last_completed_date, start_date) = match entry.kind {
        EntryKind::Task { due_date } => (Some(due_date), None, None, None, None),
        EntryKind::Habit {
            recurrence,
            streak_count,
            last_completed_date,
            start_date,
        } => (
            None,
            Some(recurrence),
            streak_count,
            last_completed_date,
            Some(start_date),
        ),
    };

    // Upsert instead of INSERT OR REPLACE: a replace deletes the row first and
    // would cascade away the completion history.
    conn.execute(
        "INSERT INTO entries (id, entry_type, title, description, is_done, time, created_at,
             updated_at, due_date, recurrence, streak_count, last_completed_date, start_date,
             sync_state)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             description = excluded.description,
             is_done = excluded.is_done,
             time = excluded.time,
             created_at = excluded.created_at,
             updated_at = excluded.updated_at,
             due_date = excluded.due_date,
             recurrence = excluded.recurrence,
             streak_count = excluded.streak_count,
             last_completed_date = excluded.last_completed_date,
             start_date = excluded.start_date,
             sync_state = excluded.sync_state",
        params![
            entry.id,
            entry.entry_type(),
            entry.title,
            entry.description,
            entry.is_done,
            entry.time,
            entry.created_at,
            entry.updated_at,
            due_date,
            recurrence,
            streak_count,
            last_completed_date,
            start_date,
            entry.sync_state,
        ],
    )?;
    Ok(())
}

/// Unconditional write of a local mutation.
pub fn insert_or_replace(conn: &Connection, entry: &Entry) -> Result<()> {
    check_variant(conn, entry)?;
    write_row(conn, entry)
}

/// Write `entry` only if it is newer than the stored row.
///
/// Strictly older incoming rows are logged to `sync_conflicts`, once per
/// `(entry_id, local_updated_at, incoming_updated_at)`.
pub fn upsert_if_newest(conn: &Connection, entry: &Entry, now_millis: i64) -> Result<UpsertOutcome> {
    let current = check_variant(conn, entry)?;
    let resolution = resolve(entry, current.as_ref());
    if resolution.applies() {
        write_row(conn, entry)?;
        return Ok(UpsertOutcome::Applied);
    }

    if resolution == Resolution::KeepStale {
        let local_updated_at = current.as_ref().map_or(0, Entry::updated_at_or_epoch);
        conn.execute(
            "INSERT INTO sync_conflicts (entry_id, local_updated_at, incoming_updated_at, resolved_at, strategy)
             SELECT ?1, ?2, ?3, ?4, ?5
             WHERE NOT EXISTS (
                 SELECT 1 FROM sync_conflicts
                 WHERE entry_id = ?1 AND local_updated_at = ?2 AND incoming_updated_at = ?3
             )",
            params![
                entry.id,
                local_updated_at,
                entry.updated_at_or_epoch(),
                now_millis,
                LWW_STRATEGY
            ],
        )?;
    }
    Ok(UpsertOutcome::Ignored(resolution))
}

pub fn update_sync_state(conn: &Connection, id: &EntryId, state: SyncState) -> Result<()> {
    let rows = conn.execute(
        "UPDATE entries SET sync_state = ? WHERE id = ?",
        params![state, id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound(id.to_string()));
    }
    Ok(())
}

pub fn delete_entry(conn: &Connection, id: &EntryId) -> Result<bool> {
    let rows = conn.execute("DELETE FROM entries WHERE id = ?", params![id])?;
    Ok(rows > 0)
}

pub fn insert_done(conn: &Connection, done: &DoneEntry) -> Result<bool> {
    let rows = conn.execute(
        "INSERT OR IGNORE INTO done_entries (id, date, done_at) VALUES (?, ?, ?)",
        params![done.id, done.date, done.done_at],
    )?;
    Ok(rows > 0)
}

pub fn delete_done(conn: &Connection, id: &EntryId, date: NaiveDate) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM done_entries WHERE id = ? AND date = ?",
        params![id, date],
    )?;
    Ok(rows > 0)
}

pub fn list_done(conn: &Connection, id: &EntryId) -> Result<Vec<DoneEntry>> {
    let mut stmt =
        conn.prepare("SELECT id, date, done_at FROM done_entries WHERE id = ? ORDER BY date ASC")?;
    let done = stmt
        .query_map(params![id], parse_done)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(done)
}

pub fn insert_tombstone(conn: &Connection, tombstone: &DeletedEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO deleted_entries (id, deleted_at, sync_state) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET deleted_at = excluded.deleted_at, sync_state = excluded.sync_state",
        params![tombstone.id, tombstone.deleted_at, tombstone.sync_state],
    )?;
    Ok(())
}

pub fn get_tombstone(conn: &Connection, id: &EntryId) -> Result<Option<DeletedEntry>> {
    let tombstone = conn
        .query_row(
            "SELECT id, deleted_at, sync_state FROM deleted_entries WHERE id = ?",
            params![id],
            parse_tombstone,
        )
        .optional()?;
    Ok(tombstone)
}

pub fn list_tombstones(conn: &Connection, state: SyncState) -> Result<Vec<DeletedEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, deleted_at, sync_state FROM deleted_entries WHERE sync_state = ? ORDER BY deleted_at ASC",
    )?;
    let tombstones = stmt
        .query_map(params![state], parse_tombstone)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tombstones)
}

pub fn update_tombstone_state(conn: &Connection, id: &EntryId, state: SyncState) -> Result<()> {
    let rows = conn.execute(
        "UPDATE deleted_entries SET sync_state = ? WHERE id = ?",
        params![state, id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound(id.to_string()));
    }
    Ok(())
}

pub fn purge_tombstone(conn: &Connection, id: &EntryId) -> Result<()> {
    conn.execute("DELETE FROM deleted_entries WHERE id = ?", params![id])?;
    Ok(())
}

pub fn list_conflicts(conn: &Connection, limit: usize) -> Result<Vec<SyncConflict>> {
    let mut stmt = conn.prepare(
        "SELECT id, entry_id, local_updated_at, incoming_updated_at, resolved_at, strategy
         FROM sync_conflicts
         ORDER BY resolved_at DESC, id DESC
         LIMIT ?",
    )?;
    let conflicts = stmt
        .query_map(params![limit as i64], |row| {
            Ok(SyncConflict {
                id: row.get(0)?,
                entry_id: row.get(1)?,
                local_updated_at: row.get(2)?,
                incoming_updated_at: row.get(3)?,
                resolved_at: row.get(4)?,
                strategy: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(conflicts)
}
