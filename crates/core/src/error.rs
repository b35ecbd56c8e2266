//! Unified error types for reelcache.
//!
//! Each variant carries a stable uppercase code in its `Display` output so
//! callers can match on the prefix without depending on the enum.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the reelcache layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty username).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Nothing has ever been cached for the key and the upstream is unreachable.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// The upstream answered with a non-zero application status.
    #[error("UPSTREAM_ERROR: code {code}: {msg}")]
    Upstream { code: i64, msg: String },

    /// The upstream call failed below the application layer.
    #[error("TRANSPORT_ERROR: {message}")]
    Transport { retryable: bool, message: String },

    /// The cache backing store could not be read or written.
    #[error("CACHE_UNAVAILABLE: {0}")]
    CacheUnavailable(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored payload could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),
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

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::NotFound(msg) => (-32001, msg.clone()),
            Error::Upstream { code, msg } => (-32008, format!("upstream code {code}: {msg}")),
            Error::Transport { message, .. } => (-32006, message.clone()),
            Error::CacheUnavailable(msg) => (-32002, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CorruptEntry(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("profile:alice".to_string());
        assert!(err.to_string().contains("NOT_FOUND"));
        assert!(err.to_string().contains("profile:alice"));

        let err = Error::Upstream { code: 10001, msg: "user not exist".into() };
        assert_eq!(err.to_string(), "UPSTREAM_ERROR: code 10001: user not exist");
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::NotFound("profile:alice".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let err = Error::Transport { retryable: false, message: "status 404".into() };
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32006);
    }
}
