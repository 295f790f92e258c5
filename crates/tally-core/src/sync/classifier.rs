//! Failure classification into retryable and terminal errors.
//!
//! Anything a classifier does not affirmatively recognise as transient is
//! permanent, so unknown failures are never retried forever.

use std::fmt;
use std::io::ErrorKind;
use std::sync::Arc;

use rusqlite::ErrorCode;

use crate::error::{Error, RemoteError};

/// A classified failure
#[derive(Debug)]
pub enum ErrorType {
    /// Retry-eligible: connectivity loss, timeout, lock contention
    Transient(Error),
    /// Not retried automatically
    Permanent(Error),
}

impl ErrorType {
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub const fn cause(&self) -> &Error {
        match self {
            Self::Transient(cause) | Self::Permanent(cause) => cause,
        }
    }

    pub fn into_cause(self) -> Error {
        match self {
            Self::Transient(cause) | Self::Permanent(cause) => cause,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(cause) => write!(f, "transient: {cause}"),
            Self::Permanent(cause) => write!(f, "permanent: {cause}"),
        }
    }
}

/// Maps a failure to an [`ErrorType`]
pub trait ErrorClassifier: Send + Sync {
    /// Whether this classifier recognises `error` as transient
    fn is_transient(&self, error: &Error) -> bool;

    fn classify(&self, error: Error) -> ErrorType {
        if self.is_transient(&error) {
            ErrorType::Transient(error)
        } else {
            ErrorType::Permanent(error)
        }
    }
}

/// Storage-layer failures: busy/locked databases and I/O timeouts are transient
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseErrorClassifier;

impl ErrorClassifier for DatabaseErrorClassifier {
    fn is_transient(&self, error: &Error) -> bool {
        match error {
            Error::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            Error::Database(message) => {
                let message = message.to_ascii_lowercase();
                message.contains("busy") || message.contains("locked")
            }
            Error::Io(io) => matches!(
                io.kind(),
                ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

/// Remote failures: connectivity, timeouts, throttling and 5xx are transient
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkErrorClassifier;

impl ErrorClassifier for NetworkErrorClassifier {
    fn is_transient(&self, error: &Error) -> bool {
        match error {
            Error::Remote(remote) => matches!(
                remote,
                RemoteError::Connectivity(_)
                    | RemoteError::Timeout
                    | RemoteError::RateLimited
                    | RemoteError::Server { .. }
            ),
            Error::Io(io) => matches!(
                io.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::NotConnected
                    | ErrorKind::BrokenPipe
                    | ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// Composite classifier used by the sync engine.
///
/// Asks each delegate in order; the failure is transient if any of them says so.
#[derive(Clone)]
pub struct SyncErrorClassifier {
    delegates: Vec<Arc<dyn ErrorClassifier>>,
}

impl SyncErrorClassifier {
    pub fn new(delegates: Vec<Arc<dyn ErrorClassifier>>) -> Self {
        Self { delegates }
    }
}

impl Default for SyncErrorClassifier {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(DatabaseErrorClassifier),
            Arc::new(NetworkErrorClassifier),
        ])
    }
}

impl ErrorClassifier for SyncErrorClassifier {
    fn is_transient(&self, error: &Error) -> bool {
        self.delegates
            .iter()
            .any(|delegate| delegate.is_transient(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy() -> Error {
        Error::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ))
    }

    fn constraint() -> Error {
        Error::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed".to_string()),
        ))
    }

    #[test]
    fn database_classifier_recognises_contention() {
        let classifier = DatabaseErrorClassifier;
        assert!(classifier.is_transient(&busy()));
        assert!(classifier.is_transient(&Error::Database("database is locked".into())));
        assert!(!classifier.is_transient(&constraint()));
        assert!(!classifier.is_transient(&RemoteError::Timeout.into()));
    }

    #[test]
    fn network_classifier_recognises_connectivity() {
        let classifier = NetworkErrorClassifier;
        assert!(classifier.is_transient(&RemoteError::Timeout.into()));
        assert!(classifier.is_transient(&RemoteError::Connectivity("reset".into()).into()));
        assert!(classifier.is_transient(
            &RemoteError::Server {
                status: 503,
                message: String::new()
            }
            .into()
        ));
        assert!(!classifier.is_transient(&RemoteError::Unauthorized("no".into()).into()));
        assert!(!classifier.is_transient(&RemoteError::NotFound("gone".into()).into()));
        assert!(!classifier.is_transient(&RemoteError::Malformed("bad".into()).into()));
    }

    #[test]
    fn composite_is_transient_when_only_network_recognises() {
        let error: Error = RemoteError::Timeout.into();
        assert!(!DatabaseErrorClassifier.is_transient(&error));

        let classified = SyncErrorClassifier::default().classify(error);
        assert!(classified.is_transient());
    }

    #[test]
    fn composite_is_permanent_when_nobody_recognises() {
        let classifier = SyncErrorClassifier::default();
        let classified = classifier.classify(Error::InvalidInput("title".into()));
        assert!(matches!(classified, ErrorType::Permanent(Error::InvalidInput(_))));
        assert!(!classifier.classify(constraint()).is_transient());
    }

    #[test]
    fn composite_keeps_database_transients() {
        assert!(SyncErrorClassifier::default().classify(busy()).is_transient());
    }

    #[test]
    fn empty_composite_fails_closed() {
        let classifier = SyncErrorClassifier::new(Vec::new());
        assert!(!classifier.classify(RemoteError::Timeout.into()).is_transient());
    }
}
