//! cache_test tool implementation.
//!
//! Runs a write-then-read round trip against the cache store and reports
//! background refresh counters.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use reelcache_client::CacheOrchestrator;

use crate::tools::json_result;

/// Parameters for the cache_test tool (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheTestParams {}

/// Output from the cache_test tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheTestOutput {
    pub success: bool,
    /// Store backing (`sqlite` or `memory`).
    pub backend: String,
    pub writable: bool,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    pub refresh: RefreshStats,
}

/// Background refresh counters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RefreshStats {
    pub accepted: u64,
    pub deduplicated: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub pending: usize,
}

pub async fn test_impl(
    orchestrator: &CacheOrchestrator, _params: CacheTestParams,
) -> Result<CallToolResult, McpError> {
    let report = orchestrator.test_cache_connection().await;
    let stats = orchestrator.scheduler().stats();

    let output = CacheTestOutput {
        success: report.success,
        backend: report.backend,
        writable: report.writable,
        elapsed_ms: report.elapsed_ms,
        error: report.error,
        refresh: RefreshStats {
            accepted: stats.accepted,
            deduplicated: stats.deduplicated,
            succeeded: stats.succeeded,
            failed: stats.failed,
            pending: stats.pending,
        },
    };
    json_result(&output)
}
