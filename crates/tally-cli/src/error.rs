use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tally_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Entry ID cannot be empty")]
    EmptyEntryId,
    #[error("Entry not found for id/prefix: {0}")]
    EntryNotFound(String),
    #[error("{0}")]
    AmbiguousEntryId(String),
    #[error("Failed to read config at {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error(
        "Sync is not configured. Set TALLY_REMOTE_URL and TALLY_REMOTE_TOKEN, or add remote_url and remote_token to the config file."
    )]
    SyncNotConfigured,
}
