//! cache_warm tool implementation.
//!
//! Schedules background profile refreshes for a list of usernames,
//! defaulting to the configured trending profiles. Returns immediately.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use reelcache_client::CacheOrchestrator;

use crate::tools::{clean_username, json_result};

/// Parameters for the cache_warm tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheWarmParams {
    /// Usernames to warm. Defaults to the configured trending profiles.
    #[serde(default)]
    pub usernames: Option<Vec<String>>,
}

/// Output from the cache_warm tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheWarmOutput {
    /// Usernames submitted after cleaning.
    pub requested: usize,
    /// Jobs accepted by the scheduler; duplicates of pending jobs are dropped.
    pub accepted: usize,
    /// Refresh jobs pending or running after submission.
    pub pending: usize,
}

pub async fn warm_impl(
    orchestrator: &CacheOrchestrator, trending: &[String], params: CacheWarmParams,
) -> Result<CallToolResult, McpError> {
    let raw = params.usernames.unwrap_or_else(|| trending.to_vec());
    let usernames = raw.iter().map(|name| clean_username(name)).collect::<Result<Vec<_>, _>>()?;

    let accepted = orchestrator.warm_trending_profiles_cache(&usernames);
    let output = CacheWarmOutput { requested: usernames.len(), accepted, pending: orchestrator.scheduler().pending() };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{CannedTransport, orchestrator, result_text};
    use reelcache_core::{CacheKey, CacheStore};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_warm_defaults_to_trending() {
        let transport = Arc::new(CannedTransport::ok(json!({"user": {}})));
        let (orchestrator, store) = orchestrator(transport.clone());
        let trending = vec!["tiktok".to_string(), "khaby.lame".to_string()];

        let result = warm_impl(&orchestrator, &trending, CacheWarmParams::default()).await.unwrap();
        let output: CacheWarmOutput = serde_json::from_str(&result_text(&result)).unwrap();
        assert_eq!(output.requested, 2);
        assert_eq!(output.accepted, 2);

        orchestrator.scheduler().wait_idle().await;
        assert_eq!(transport.calls(), 2);
        assert!(store.exists(&CacheKey::profile("khaby.lame")).await.unwrap());
    }

    #[tokio::test]
    async fn test_warm_explicit_usernames() {
        let (orchestrator, _store) = orchestrator(Arc::new(CannedTransport::ok(json!({}))));
        let params = CacheWarmParams { usernames: Some(vec!["@alice".into(), "alice".into()]) };

        let result = warm_impl(&orchestrator, &[], params).await.unwrap();
        let output: CacheWarmOutput = serde_json::from_str(&result_text(&result)).unwrap();
        assert_eq!(output.requested, 2);
        assert_eq!(output.accepted, 1);
        orchestrator.scheduler().wait_idle().await;
    }

    #[tokio::test]
    async fn test_warm_rejects_blank_username() {
        let (orchestrator, _store) = orchestrator(Arc::new(CannedTransport::ok(json!({}))));
        let params = CacheWarmParams { usernames: Some(vec!["alice".into(), "  ".into()]) };

        assert!(warm_impl(&orchestrator, &[], params).await.is_err());
        assert_eq!(orchestrator.scheduler().stats().accepted, 0);
    }
}
