//! profile_get tool implementation.
//!
//! Returns a user's profile (`user` and `stats`) through the cache.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use reelcache_client::CacheOrchestrator;

use super::{LookupOutput, clean_username, json_result};

/// Parameters for the profile_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProfileGetParams {
    /// Username, with or without a leading `@`.
    pub username: String,

    /// Fetch from upstream even if a fresh entry is cached.
    #[serde(default)]
    pub force_refresh: bool,
}

pub async fn profile_impl(
    orchestrator: &CacheOrchestrator, params: ProfileGetParams,
) -> Result<CallToolResult, McpError> {
    let username = clean_username(&params.username)?;
    let lookup = orchestrator.get_profile(&username, params.force_refresh).await?;
    json_result(&LookupOutput::from(lookup.into_response()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{CannedTransport, orchestrator, result_text};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_profile_get_fetches_then_caches() {
        let transport = Arc::new(CannedTransport::ok(json!({"user": {"uniqueId": "alice"}, "stats": {}})));
        let (orchestrator, _store) = orchestrator(transport.clone());

        let params = ProfileGetParams { username: "@alice".into(), force_refresh: false };
        let first: LookupOutput =
            serde_json::from_str(&result_text(&profile_impl(&orchestrator, params.clone()).await.unwrap())).unwrap();
        assert_eq!(first.data["user"]["uniqueId"], "alice");
        assert!(first.cached_at.is_none());
        assert_eq!(first.code, 0);

        let second: LookupOutput =
            serde_json::from_str(&result_text(&profile_impl(&orchestrator, params).await.unwrap())).unwrap();
        assert!(second.cached_at.is_some());
        assert!(!second.is_stale);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_profile_get_rejects_empty_username() {
        let (orchestrator, _store) = orchestrator(Arc::new(CannedTransport::ok(json!({}))));
        let params = ProfileGetParams { username: " @ ".into(), force_refresh: false };

        let err = profile_impl(&orchestrator, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_profile_get_unreachable_upstream() {
        let (orchestrator, _store) = orchestrator(Arc::new(CannedTransport::status(503)));
        let params = ProfileGetParams { username: "alice".into(), force_refresh: false };

        let err = profile_impl(&orchestrator, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }
}
