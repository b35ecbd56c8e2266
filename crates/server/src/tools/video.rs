//! video_get tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use reelcache_client::CacheOrchestrator;

use super::{LookupOutput, clean_required, json_result};

/// Parameters for the video_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoGetParams {
    /// Upstream video id.
    pub video_id: String,

    /// Fetch from upstream even if a fresh entry is cached.
    #[serde(default)]
    pub force_refresh: bool,
}

pub async fn video_impl(
    orchestrator: &CacheOrchestrator, params: VideoGetParams,
) -> Result<CallToolResult, McpError> {
    let video_id = clean_required("video_id", &params.video_id)?;
    let lookup = orchestrator.get_video(&video_id, params.force_refresh).await?;
    json_result(&LookupOutput::from(lookup.into_response()))
}
