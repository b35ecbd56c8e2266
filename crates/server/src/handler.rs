//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CachePurgeParams, CacheTestParams, CacheWarmParams, purge_impl, test_impl, warm_impl};
use crate::tools::profile::{ProfileGetParams, profile_impl};
use crate::tools::video::{VideoGetParams, video_impl};
use crate::tools::videos::{VideosGetParams, videos_impl};

use reelcache_client::CacheOrchestrator;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for reelcache.
#[derive(Clone)]
pub struct ReelcacheServer {
    tool_router: ToolRouter<Self>,
    orchestrator: CacheOrchestrator,
    trending: Arc<Vec<String>>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ReelcacheServer {
    /// Create a new server handler.
    ///
    /// `trending` is the default username list for `cache_warm`.
    pub fn new(orchestrator: CacheOrchestrator, trending: Vec<String>) -> Self {
        Self { tool_router: Self::tool_router(), orchestrator, trending: Arc::new(trending) }
    }

    #[tool(
        description = "Get a user's profile. Serves cached data when available; stale data is returned immediately and refreshed in the background."
    )]
    async fn profile_get(&self, params: Parameters<ProfileGetParams>) -> Result<CallToolResult, McpError> {
        profile_impl(&self.orchestrator, params.0).await
    }

    #[tool(
        description = "Get one page of a user's videos. Pass the returned next_cursor to read the following page."
    )]
    async fn videos_get(&self, params: Parameters<VideosGetParams>) -> Result<CallToolResult, McpError> {
        videos_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Get details for a single video by id.")]
    async fn video_get(&self, params: Parameters<VideoGetParams>) -> Result<CallToolResult, McpError> {
        video_impl(&self.orchestrator, params.0).await
    }

    #[tool(
        description = "Schedule background profile refreshes. Defaults to the configured trending profiles; returns without waiting."
    )]
    async fn cache_warm(&self, params: Parameters<CacheWarmParams>) -> Result<CallToolResult, McpError> {
        warm_impl(&self.orchestrator, &self.trending, params.0).await
    }

    #[tool(description = "Check that the cache store accepts a write-then-read round trip and report refresh counters.")]
    async fn cache_test(&self, params: Parameters<CacheTestParams>) -> Result<CallToolResult, McpError> {
        test_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Evict expired cache entries, or remove the entry for one profile, video page or video.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.orchestrator, params.0).await
    }
}

impl ServerHandler for ReelcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "reelcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
