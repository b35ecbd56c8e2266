//! Orchestrators over canned upstream responses for tool tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reelcache_client::transport::RawResponse;
use reelcache_client::{CacheOrchestrator, RemoteFetcher, Transport, TransportError, TransportRequest, UpstreamConfig};
use reelcache_core::{CachePolicy, CacheStore, MemoryStore};
use serde_json::{Value, json};

/// Answers every request with the same status and body.
pub(crate) struct CannedTransport {
    status: u16,
    body: String,
    pub(crate) calls: AtomicUsize,
}

impl CannedTransport {
    pub(crate) fn ok(data: Value) -> Self {
        Self {
            status: 200,
            body: json!({"code": 0, "msg": "success", "data": data}).to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Self { status, body: "unavailable".into(), calls: AtomicUsize::new(0) }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn get(&self, _request: &TransportRequest) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RawResponse { status: self.status, body: Bytes::from(self.body.clone()), fetch_ms: 0 })
    }
}

/// An orchestrator over a fresh in-memory store.
pub(crate) fn orchestrator(transport: Arc<CannedTransport>) -> (CacheOrchestrator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = UpstreamConfig { api_key: Some("test-key".into()), max_retries: 0, ..UpstreamConfig::default() };
    let orchestrator = CacheOrchestrator::new(
        store.clone() as Arc<dyn CacheStore>,
        RemoteFetcher::new(config, transport),
        CachePolicy::default(),
        2,
    );
    (orchestrator, store)
}

/// Text of the first content item of a tool result.
pub(crate) fn result_text(result: &rmcp::model::CallToolResult) -> String {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content")
        .to_string()
}
