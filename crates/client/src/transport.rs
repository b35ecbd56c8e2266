//! HTTP transport seam.
//!
//! The fetcher talks to the network only through [`Transport`], so retry and
//! classification logic can be driven by scripted transports in tests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

/// Maximum response body size (5MB).
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// A fully-resolved GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub query: Vec<(&'static str, String)>,
    pub timeout: Duration,
}

/// Status and body of a completed exchange. Any status is returned as-is.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
    pub fetch_ms: u64,
}

/// Failure to complete an exchange at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl TransportError {
    /// Whether repeating the request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Network(_))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &TransportRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    max_bytes: usize,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { http, max_bytes: MAX_BODY_BYTES })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &TransportRequest) -> Result<RawResponse, TransportError> {
        let start = Instant::now();

        let mut builder = self
            .http
            .get(&request.url)
            .timeout(request.timeout)
            .header(header::ACCEPT, "application/json")
            .query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.max_bytes
        {
            return Err(TransportError::TooLarge { size: len as usize, limit: self.max_bytes });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(format!("failed to read response: {e}")))?;

        if body.len() > self.max_bytes {
            return Err(TransportError::TooLarge { size: body.len(), limit: self.max_bytes });
        }

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(url = %request.url, status, fetch_ms, bytes = body.len(), "upstream exchange completed");

        Ok(RawResponse { status, body, fetch_ms })
    }
}
