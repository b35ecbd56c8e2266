//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REELCACHE_*)
//! 2. TOML config file (if REELCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{CachePolicy, TtlPolicy};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REELCACHE_*)
/// 2. TOML config file (if REELCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// RapidAPI key sent as `X-RapidAPI-Key`.
    ///
    /// Set via REELCACHE_API_KEY environment variable.
    /// Required only when the upstream is actually called.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upstream API base URL.
    ///
    /// Set via REELCACHE_BASE_URL environment variable.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value for the `X-RapidAPI-Host` header. Derived from `base_url` when unset.
    #[serde(default)]
    pub api_host: Option<String>,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-attempt upstream timeout in milliseconds.
    ///
    /// Set via REELCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Additional attempts after the first for retryable failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff time unit in milliseconds; retry `n` waits `2^n` units.
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// Videos requested per posts page.
    #[serde(default = "default_page_size")]
    pub page_size: u8,

    #[serde(default = "default_profile_ttl_fresh_secs")]
    pub profile_ttl_fresh_secs: u64,

    #[serde(default = "default_profile_ttl_stale_secs")]
    pub profile_ttl_stale_secs: u64,

    #[serde(default = "default_videos_ttl_fresh_secs")]
    pub videos_ttl_fresh_secs: u64,

    #[serde(default = "default_videos_ttl_stale_secs")]
    pub videos_ttl_stale_secs: u64,

    #[serde(default = "default_video_ttl_fresh_secs")]
    pub video_ttl_fresh_secs: u64,

    #[serde(default = "default_video_ttl_stale_secs")]
    pub video_ttl_stale_secs: u64,

    /// Maximum number of background refresh jobs running at once.
    #[serde(default = "default_refresh_workers")]
    pub refresh_workers: usize,

    /// Path to the SQLite cache database. In-memory cache when unset.
    ///
    /// Set via REELCACHE_DB_PATH environment variable.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Profiles warmed by `cache_warm` when no usernames are given.
    #[serde(default = "default_trending_profiles")]
    pub trending_profiles: Vec<String>,
}

fn default_base_url() -> String {
    "https://tiktok-scraper7.p.rapidapi.com".into()
}

fn default_user_agent() -> String {
    "reelcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_unit_ms() -> u64 {
    1_000
}

fn default_page_size() -> u8 {
    10
}

fn default_profile_ttl_fresh_secs() -> u64 {
    60 * 60
}

fn default_profile_ttl_stale_secs() -> u64 {
    24 * 60 * 60
}

fn default_videos_ttl_fresh_secs() -> u64 {
    30 * 60
}

fn default_videos_ttl_stale_secs() -> u64 {
    12 * 60 * 60
}

fn default_video_ttl_fresh_secs() -> u64 {
    6 * 60 * 60
}

fn default_video_ttl_stale_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_refresh_workers() -> usize {
    4
}

fn default_trending_profiles() -> Vec<String> {
    ["tiktok", "charlidamelio", "addisonre", "khaby.lame", "bellapoarch"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            api_host: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_unit_ms: default_backoff_unit_ms(),
            page_size: default_page_size(),
            profile_ttl_fresh_secs: default_profile_ttl_fresh_secs(),
            profile_ttl_stale_secs: default_profile_ttl_stale_secs(),
            videos_ttl_fresh_secs: default_videos_ttl_fresh_secs(),
            videos_ttl_stale_secs: default_videos_ttl_stale_secs(),
            video_ttl_fresh_secs: default_video_ttl_fresh_secs(),
            video_ttl_stale_secs: default_video_ttl_stale_secs(),
            refresh_workers: default_refresh_workers(),
            db_path: None,
            trending_profiles: default_trending_profiles(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Backoff unit as Duration.
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    /// Freshness windows for every resource kind.
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            profile: TtlPolicy::from_secs(self.profile_ttl_fresh_secs, self.profile_ttl_stale_secs),
            video_page: TtlPolicy::from_secs(self.videos_ttl_fresh_secs, self.videos_ttl_stale_secs),
            video_detail: TtlPolicy::from_secs(self.video_ttl_fresh_secs, self.video_ttl_stale_secs),
            ..CachePolicy::default()
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REELCACHE_`
    /// 2. TOML file from `REELCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REELCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REELCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the API key is not set.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "api_key".into(),
                hint: "Set REELCACHE_API_KEY environment variable".into(),
            })
    }

    /// The `X-RapidAPI-Host` header value.
    ///
    /// Falls back to the host portion of `base_url`.
    pub fn resolved_api_host(&self) -> Option<String> {
        self.api_host.clone().or_else(|| {
            url::Url::parse(&self.base_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        })
    }
}
