//! MCP tool implementations.
//!
//! Tools only clean their input and shape their output; every caching
//! decision is made by the orchestrator.

pub mod cache;
pub mod profile;
pub mod video;
pub mod videos;

#[cfg(test)]
pub(crate) mod test_support;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use reelcache_client::CachedResponse;

use crate::error::ToolError;

/// Trim a username and strip one leading `@`.
pub fn clean_username(raw: &str) -> Result<String, ToolError> {
    let trimmed = raw.trim();
    let name = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();
    if name.is_empty() {
        return Err(ToolError::InvalidInput("username must not be empty".into()));
    }
    Ok(name.to_string())
}

/// Trim a required identifier.
pub fn clean_required(field: &str, raw: &str) -> Result<String, ToolError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ToolError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

/// Common shape of every read tool's output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LookupOutput {
    /// The upstream `data` payload.
    pub data: Value,
    /// True when the data is past its fresh window.
    pub is_stale: bool,
    /// RFC 3339 fetch time, when served from the cache.
    pub cached_at: Option<String>,
    /// `0` on success; otherwise the code of the failed refresh.
    pub code: i64,
    pub msg: String,
}

impl From<CachedResponse> for LookupOutput {
    fn from(response: CachedResponse) -> Self {
        Self {
            data: response.data,
            is_stale: response.is_stale,
            cached_at: response.cached_at.map(|t| t.to_rfc3339()),
            code: response.code,
            msg: response.msg,
        }
    }
}

/// Serialize `output` as the tool's single text content item.
pub fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::OutputFailed(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
