//! Video-profile API surface.
//!
//! ### Endpoints
//!
//! - **Base URL**: `https://tiktok-scraper7.p.rapidapi.com`
//! - **Authentication**: `X-RapidAPI-Key` and `X-RapidAPI-Host` headers.
//! - **Operations**: `user/info`, `user/posts` and `video/info`, all `GET`.
//! - **Envelope**: every response is `{code, msg, data}`; `code == 0` is success.
//!
//! A missing API key is not a startup error. Fetches fail with a
//! non-retryable transport failure and cached data keeps being served.

pub mod request;
pub mod response;
pub mod result;

pub use request::UpstreamRequest;
pub use response::{Envelope, PostsPage, decode};
pub use result::{ApiResult, Classification, FetchFailure, TRANSPORT_FAILURE_CODE, TransportFailure};

use reelcache_core::AppConfig;
use std::time::Duration;

/// Default base URL for the upstream API.
const DEFAULT_BASE_URL: &str = "https://tiktok-scraper7.p.rapidapi.com";

/// Default host header value.
const DEFAULT_API_HOST: &str = "tiktok-scraper7.p.rapidapi.com";

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "reelcache/0.1";

/// Upstream client configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// API key sent as `X-RapidAPI-Key`.
    pub api_key: Option<String>,
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// `X-RapidAPI-Host` header value.
    pub api_host: String,
    pub user_agent: String,
    /// Per-attempt timeout (default: 15s).
    pub timeout: Duration,
    /// Retries after the first attempt (default: 2).
    pub max_retries: u32,
    /// Backoff before retry `n` is `backoff_unit * 2^n` (default: 1s).
    pub backoff_unit: Duration,
    /// Videos per `user/posts` page (default: 10).
    pub page_size: u8,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_host: DEFAULT_API_HOST.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(15),
            max_retries: 2,
            backoff_unit: Duration::from_secs(1),
            page_size: 10,
        }
    }
}

impl UpstreamConfig {
    /// Build from the loaded application configuration.
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            api_key: config.require_api_key().ok().map(str::to_string),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_host: config
                .resolved_api_host()
                .unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
            backoff_unit: config.backoff_unit(),
            page_size: config.page_size,
        }
    }

    /// Full URL for a request, without its query string.
    pub fn endpoint(&self, req: &UpstreamRequest) -> String {
        format!("{}{}", self.base_url, req.path())
    }
}
