//! cache_purge tool implementation.
//!
//! Evicts expired entries, or removes the entry for one resource.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use reelcache_client::CacheOrchestrator;
use reelcache_core::{CacheKey, ResourceKind};

use crate::error::ToolError;
use crate::tools::{clean_required, clean_username, json_result};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Evict every entry past its stale window.
    #[serde(default)]
    pub expired: bool,

    /// Resource kind to invalidate: `profile`, `videos` or `video`.
    #[serde(default)]
    pub kind: Option<String>,

    /// Username (for `profile`/`videos`) or video id (for `video`).
    #[serde(default)]
    pub subject: Option<String>,

    /// Page cursor, for `videos` only.
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

fn target_key(kind: &str, subject: &str, cursor: Option<&str>) -> Result<CacheKey, ToolError> {
    match ResourceKind::parse(kind.trim()) {
        Some(ResourceKind::Profile) => Ok(CacheKey::profile(clean_username(subject)?)),
        Some(ResourceKind::VideoPage) => Ok(CacheKey::video_page(clean_username(subject)?, cursor)),
        Some(ResourceKind::VideoDetail) => Ok(CacheKey::video_detail(clean_required("subject", subject)?)),
        Some(ResourceKind::Diagnostic) | None => Err(ToolError::InvalidInput(format!(
            "kind must be one of profile, videos, video (got {kind:?})"
        ))),
    }
}

pub async fn purge_impl(
    orchestrator: &CacheOrchestrator, params: CachePurgeParams,
) -> Result<CallToolResult, McpError> {
    if !params.expired && params.kind.is_none() {
        return Err(ToolError::InvalidInput("At least one of expired or kind must be specified".to_string()).into());
    }

    let mut deleted_total = 0u64;

    if let Some(kind) = params.kind.as_deref() {
        let subject = params
            .subject
            .as_deref()
            .ok_or_else(|| ToolError::InvalidInput("subject is required with kind".to_string()))?;
        let key = target_key(kind, subject, params.cursor.as_deref())?;
        if orchestrator.invalidate(&key).await? {
            deleted_total += 1;
        }
    }

    if params.expired {
        deleted_total += orchestrator.purge_expired().await?;
    }

    json_result(&CachePurgeOutput { deleted: deleted_total })
}
