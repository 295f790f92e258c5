//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get::<_, i32>(0),
        )
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Apply a list of statements atomically
fn apply(conn: &mut Connection, statements: &[&str]) -> Result<()> {
    let tx = conn.transaction()?;
    for stmt in statements {
        tx.execute(stmt, [])?;
    }
    tx.commit()?;
    Ok(())
}

/// Migration to version 1: Entries, completion history, tombstones
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Entries table (tasks and habits share one row shape)
        "CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            entry_type TEXT NOT NULL CHECK (entry_type IN ('task', 'habit')),
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            is_done INTEGER NOT NULL DEFAULT 0,
            time TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER,
            due_date TEXT,
            recurrence TEXT,
            streak_count INTEGER,
            last_completed_date INTEGER,
            start_date TEXT,
            sync_state TEXT NOT NULL DEFAULT 'pending'
        )",
        "CREATE INDEX IF NOT EXISTS idx_entries_type ON entries(entry_type)",
        "CREATE INDEX IF NOT EXISTS idx_entries_sync_state ON entries(sync_state)",
        "CREATE INDEX IF NOT EXISTS idx_entries_due_date ON entries(due_date)",
        "CREATE INDEX IF NOT EXISTS idx_entries_start_date ON entries(start_date)",
        // Completion history
        "CREATE TABLE IF NOT EXISTS done_entries (
            id TEXT NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            done_at INTEGER NOT NULL,
            PRIMARY KEY (id, date)
        )",
        "CREATE INDEX IF NOT EXISTS idx_done_entries_date ON done_entries(date)",
        // Deletion tombstones awaiting remote confirmation
        "CREATE TABLE IF NOT EXISTS deleted_entries (
            id TEXT PRIMARY KEY,
            deleted_at INTEGER NOT NULL,
            sync_state TEXT NOT NULL DEFAULT 'pending'
        )",
        "CREATE INDEX IF NOT EXISTS idx_deleted_entries_sync_state ON deleted_entries(sync_state)",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    apply(conn, &statements)?;
    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: LWW conflict logging support
fn migrate_v2(conn: &mut Connection) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id TEXT NOT NULL,
            local_updated_at INTEGER NOT NULL,
            incoming_updated_at INTEGER NOT NULL,
            resolved_at INTEGER NOT NULL,
            strategy TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_entry_id ON sync_conflicts(entry_id)",
        "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at ON sync_conflicts(resolved_at DESC)",
        "INSERT INTO schema_version (version) VALUES (2)",
    ];

    apply(conn, &statements)?;
    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
