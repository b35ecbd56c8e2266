//! videos_get tool implementation.
//!
//! Returns one page of a user's videos. Each cursor is cached separately;
//! an absent, empty or `"0"` cursor addresses the first page.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use reelcache_client::{CacheOrchestrator, PostsPage};

use super::{LookupOutput, clean_username, json_result};

/// Parameters for the videos_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideosGetParams {
    /// Username, with or without a leading `@`.
    pub username: String,

    /// Pagination cursor returned by a previous page.
    #[serde(default)]
    pub cursor: Option<String>,

    /// Fetch from upstream even if a fresh entry is cached.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Output from the videos_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideosGetOutput {
    #[serde(flatten)]
    pub lookup: LookupOutput,
    /// Cursor for the next page, if any.
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub video_count: usize,
}

pub async fn videos_impl(
    orchestrator: &CacheOrchestrator, params: VideosGetParams,
) -> Result<CallToolResult, McpError> {
    let username = clean_username(&params.username)?;
    let lookup = orchestrator.get_videos(&username, params.cursor.as_deref(), params.force_refresh).await?;

    let page = PostsPage::from_payload(lookup.payload());
    let output = VideosGetOutput {
        lookup: LookupOutput::from(lookup.into_response()),
        next_cursor: if page.has_more { page.cursor.clone() } else { None },
        has_more: page.has_more,
        video_count: page.video_count(),
    };
    json_result(&output)
}
