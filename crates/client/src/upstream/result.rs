//! Outcome types for upstream calls.
//!
//! Every upstream call resolves to an [`ApiResult`]; nothing is raised. The
//! orchestrator pattern-matches on it instead of inspecting error types.

use std::time::Duration;

use reelcache_core::{CacheKey, Error};
use serde::Serialize;
use serde_json::Value;

use crate::transport::TransportError;

/// Status code reported to callers for failures that carry no upstream code.
pub const TRANSPORT_FAILURE_CODE: i64 = -1;

/// Longest response body excerpt kept in a failure message.
const BODY_EXCERPT_LEN: usize = 200;

/// Whether a failed attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Timeouts, connection failures, 429 and 5xx.
    Retryable,
    /// Other 4xx statuses and malformed responses.
    NonRetryable,
}

impl Classification {
    /// Classify a non-success HTTP status.
    pub fn of_status(status: u16) -> Self {
        if status == 429 || status >= 500 { Classification::Retryable } else { Classification::NonRetryable }
    }

    pub fn is_retryable(self) -> bool {
        self == Classification::Retryable
    }
}

/// A failure below the application layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportFailure {
    pub classification: Classification,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportFailure {
    pub fn timeout(after: Duration) -> Self {
        Self {
            classification: Classification::Retryable,
            status: None,
            message: format!("request timed out after {}ms", after.as_millis()),
        }
    }

    /// A non-2xx response. The body excerpt is kept for diagnostics.
    pub fn status(status: u16, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let excerpt: String = text.chars().take(BODY_EXCERPT_LEN).collect();
        Self {
            classification: Classification::of_status(status),
            status: Some(status),
            message: format!("API request failed: {status} - {excerpt}"),
        }
    }

    pub fn malformed(status: u16, reason: impl std::fmt::Display) -> Self {
        Self {
            classification: Classification::NonRetryable,
            status: Some(status),
            message: format!("malformed response: {reason}"),
        }
    }

    /// A failure that did not come from the network at all.
    pub fn internal(message: impl Into<String>) -> Self {
        Self { classification: Classification::NonRetryable, status: None, message: message.into() }
    }
}

impl From<TransportError> for TransportFailure {
    fn from(err: TransportError) -> Self {
        let classification =
            if err.is_retryable() { Classification::Retryable } else { Classification::NonRetryable };
        Self { classification, status: None, message: err.to_string() }
    }
}

/// Tagged outcome of one logical upstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult {
    /// Envelope `code == 0`; holds the envelope's `data`.
    Success(Value),
    /// Valid envelope with a non-zero application status.
    UpstreamError { code: i64, msg: String },
    TransportError(TransportFailure),
}

impl ApiResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    /// Whether the fetcher may retry after this outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiResult::TransportError(f) if f.classification.is_retryable())
    }

    pub fn into_result(self) -> Result<Value, FetchFailure> {
        match self {
            ApiResult::Success(data) => Ok(data),
            ApiResult::UpstreamError { code, msg } => Err(FetchFailure::Upstream { code, msg }),
            ApiResult::TransportError(failure) => Err(FetchFailure::Transport(failure)),
        }
    }
}

/// The failing half of an [`ApiResult`], kept as context next to stale data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("upstream code {code}: {msg}")]
    Upstream { code: i64, msg: String },

    #[error("{0}")]
    Transport(TransportFailure),
}

impl FetchFailure {
    /// Status code shown to callers; transport failures use `-1`.
    pub fn code(&self) -> i64 {
        match self {
            FetchFailure::Upstream { code, .. } => *code,
            FetchFailure::Transport(_) => TRANSPORT_FAILURE_CODE,
        }
    }

    pub fn message(&self) -> String {
        match self {
            FetchFailure::Upstream { msg, .. } => msg.clone(),
            FetchFailure::Transport(failure) => failure.message.clone(),
        }
    }

    /// Convert into the error surfaced when nothing is cached for `key`.
    ///
    /// An unreachable upstream becomes `NotFound`; a definitive answer from
    /// the upstream keeps its own variant.
    pub fn into_error(self, key: &CacheKey) -> Error {
        match self {
            FetchFailure::Upstream { code, msg } => Error::Upstream { code, msg },
            FetchFailure::Transport(f) if f.classification.is_retryable() => {
                Error::NotFound(format!("{key}: nothing cached and upstream unreachable ({})", f.message))
            }
            FetchFailure::Transport(f) => Error::Transport { retryable: false, message: f.message },
        }
    }
}
