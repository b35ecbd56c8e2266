//! Upstream response envelope decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::result::{ApiResult, TransportFailure};

/// Raw JSON envelope returned by every upstream operation.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// `0` on success.
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Value,
}

/// Decode a 2xx response body into an [`ApiResult`].
///
/// A body that is not an envelope is a non-retryable transport failure.
pub fn decode(status: u16, body: &[u8]) -> ApiResult {
    match serde_json::from_slice::<Envelope>(body) {
        Ok(envelope) if envelope.code == 0 => ApiResult::Success(envelope.data),
        Ok(envelope) => ApiResult::UpstreamError { code: envelope.code, msg: envelope.msg },
        Err(e) => ApiResult::TransportError(TransportFailure::malformed(status, e)),
    }
}

/// Normalized view of a `user/posts` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostsPage {
    pub videos: Vec<Value>,
    /// Token for the next page, as returned by the upstream.
    pub cursor: Option<String>,
    pub has_more: bool,
}

impl PostsPage {
    /// Read the `{videos, cursor, hasMore}` members of a posts payload.
    ///
    /// Missing members fall back to an empty, final page. Numeric cursors are
    /// rendered as decimal strings.
    pub fn from_payload(payload: &Value) -> Self {
        let cursor = match payload.get("cursor") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self {
            videos: payload
                .get("videos")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            cursor,
            has_more: payload.get("hasMore").and_then(Value::as_bool).unwrap_or(false),
        }
    }

    pub fn video_count(&self) -> usize {
        self.videos.len()
    }
}
