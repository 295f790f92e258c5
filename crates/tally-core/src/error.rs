//! Error types for tally-core

use thiserror::Error;

/// Result type alias using tally-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tally-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry not found
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote document store error
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,
}

/// Failures reported by the remote entry store.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("connection failed: {0}")]
    Connectivity(String),
    #[error("request timed out")]
    Timeout,
    #[error("rate limited by remote")]
    RateLimited,
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("remote document not found: {0}")]
    NotFound(String),
    #[error("malformed request or payload: {0}")]
    Malformed(String),
    #[error("request rejected {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid remote configuration: {0}")]
    InvalidConfiguration(String),
}
