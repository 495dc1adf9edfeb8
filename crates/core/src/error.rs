//! Unified error types for shotit.
//!
//! Request-grammar failures carry the exact messages returned to clients,
//! so their `Display` output is part of the HTTP contract.

use tokio_rusqlite::rusqlite;

/// Unified error types for the shotit service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request path had no target URL after the leading separator.
    #[error("No URL provided")]
    NoUrl,

    /// A suffix token was neither a date nor a known modifier.
    ///
    /// Holds the raw token as the client sent it.
    #[error("Unknown modifier: @{0}")]
    UnknownModifier(String),

    /// More than one `@YYYY-MM-DD` token in the request path.
    #[error("Only one @date modifier allowed")]
    MultipleDates,

    /// The target URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A storage key was rejected by the backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Object storage operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("database error: migration failed: {0}")]
    MigrationFailed(String),

    /// The capture backend failed to produce an image.
    #[error("Screenshot failed: {0}")]
    CaptureFailed(String),

    /// The capture target resolves to an address that must not be visited.
    #[error("Screenshot failed: target blocked: {0}")]
    BlockedTarget(String),
}

impl Error {
    /// Whether this error was caused by a malformed request path.
    ///
    /// These are client-input errors and are never retried.
    pub fn is_malformed_request(&self) -> bool {
        matches!(self, Error::NoUrl | Error::UnknownModifier(_) | Error::MultipleDates | Error::InvalidUrl(_))
    }

    /// Whether this error originated in the capture backend.
    pub fn is_capture_failure(&self) -> bool {
        matches!(self, Error::CaptureFailed(_) | Error::BlockedTarget(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_messages() {
        assert_eq!(Error::NoUrl.to_string(), "No URL provided");
        assert_eq!(Error::UnknownModifier("Unknown".into()).to_string(), "Unknown modifier: @Unknown");
        assert_eq!(Error::MultipleDates.to_string(), "Only one @date modifier allowed");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::NoUrl.is_malformed_request());
        assert!(Error::InvalidUrl("x".into()).is_malformed_request());
        assert!(!Error::Storage("boom".into()).is_malformed_request());
        assert!(Error::CaptureFailed("timeout".into()).is_capture_failure());
        assert!(!Error::MultipleDates.is_capture_failure());
    }
}
