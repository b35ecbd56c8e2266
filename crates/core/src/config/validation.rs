//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Upper bound on any TTL setting (10 years).
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `base_url` is not an http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_retries` exceeds 5 or `backoff_unit_ms` exceeds 60s
    /// - `page_size` is outside 1..=35
    /// - any fresh TTL is zero or longer than its stale TTL
    /// - any TTL exceeds 10 years
    /// - `refresh_workers` is 0 or above 64
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.base_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(_) => return Err(invalid("base_url", "scheme must be http or https")),
            Err(e) => return Err(invalid("base_url", &e.to_string())),
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_retries > 5 {
            return Err(invalid("max_retries", "must not exceed 5"));
        }
        if self.backoff_unit_ms > 60_000 {
            return Err(invalid("backoff_unit_ms", "must not exceed 60000ms"));
        }

        if !(1..=35).contains(&self.page_size) {
            return Err(invalid("page_size", "must be between 1 and 35"));
        }

        let windows = [
            ("profile_ttl_fresh_secs", self.profile_ttl_fresh_secs, self.profile_ttl_stale_secs),
            ("videos_ttl_fresh_secs", self.videos_ttl_fresh_secs, self.videos_ttl_stale_secs),
            ("video_ttl_fresh_secs", self.video_ttl_fresh_secs, self.video_ttl_stale_secs),
        ];
        for (field, fresh, stale) in windows {
            if fresh == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
            if fresh > stale {
                return Err(invalid(field, "must not exceed the matching stale TTL"));
            }
            if stale > MAX_TTL_SECS {
                return Err(invalid(&field.replace("fresh", "stale"), "must not exceed 10 years"));
            }
        }

        if self.refresh_workers == 0 || self.refresh_workers > 64 {
            return Err(invalid("refresh_workers", "must be between 1 and 64"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.api_key.is_none() {
            tracing::warn!("api_key is not set; upstream calls will fail until REELCACHE_API_KEY is provided");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_base_url() {
        let config = AppConfig { base_url: "not a url".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("base_url"));

        let config = AppConfig { base_url: "ftp://example.com".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("base_url"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_retry_settings() {
        let config = AppConfig { max_retries: 6, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_retries"));

        let config = AppConfig { backoff_unit_ms: 60_001, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("backoff_unit_ms"));
    }

    #[test]
    fn test_validate_page_size() {
        let config = AppConfig { page_size: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("page_size"));

        let config = AppConfig { page_size: 36, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("page_size"));
    }

    #[test]
    fn test_validate_fresh_longer_than_stale() {
        let config = AppConfig { profile_ttl_fresh_secs: 100, profile_ttl_stale_secs: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("profile_ttl_fresh_secs"));

        let config = AppConfig { video_ttl_fresh_secs: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("video_ttl_fresh_secs"));
    }

    #[test]
    fn test_validate_ttl_upper_bound() {
        let config = AppConfig { profile_ttl_stale_secs: 10_000_000_000_000, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("profile_ttl_stale_secs"));

        let config = AppConfig { video_ttl_stale_secs: u64::MAX, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("video_ttl_stale_secs"));

        let config = AppConfig { videos_ttl_stale_secs: MAX_TTL_SECS, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_refresh_workers() {
        let config = AppConfig { refresh_workers: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("refresh_workers"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            timeout_ms: 100,
            max_retries: 0,
            page_size: 1,
            profile_ttl_fresh_secs: 5,
            profile_ttl_stale_secs: 5,
            refresh_workers: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
