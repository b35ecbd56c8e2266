//! Results of cache reads.

use chrono::{DateTime, Utc};
use reelcache_core::{CacheEntry, Freshness};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::upstream::FetchFailure;

/// Where the returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Upstream,
}

/// The result of an orchestrated read.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub entry: CacheEntry,
    pub source: Source,
    /// True when the data is past its fresh window.
    pub is_stale: bool,
    /// Set when a refresh failed and older data was served instead.
    pub warning: Option<FetchFailure>,
}

impl Lookup {
    pub fn fresh_from_cache(entry: CacheEntry) -> Self {
        Self { entry, source: Source::Cache, is_stale: false, warning: None }
    }

    pub fn stale_from_cache(entry: CacheEntry) -> Self {
        Self { entry, source: Source::Cache, is_stale: true, warning: None }
    }

    /// Cached data, flagged stale once past its fresh window.
    pub fn from_cache(entry: CacheEntry, now: DateTime<Utc>) -> Self {
        let is_stale = entry.freshness(now) != Freshness::Fresh;
        Self { entry, source: Source::Cache, is_stale, warning: None }
    }

    pub fn fetched(entry: CacheEntry) -> Self {
        Self { entry, source: Source::Upstream, is_stale: false, warning: None }
    }

    /// Older data served because the refresh failed.
    pub fn degraded(entry: CacheEntry, failure: FetchFailure) -> Self {
        Self { entry, source: Source::Cache, is_stale: true, warning: Some(failure) }
    }

    pub fn payload(&self) -> &Value {
        &self.entry.payload
    }

    pub fn into_response(self) -> CachedResponse {
        let cached_at = match self.source {
            Source::Cache => Some(self.entry.fetched_at),
            Source::Upstream => None,
        };
        let (code, msg) = match &self.warning {
            Some(failure) => (failure.code(), failure.message()),
            None => (0, "success".to_string()),
        };

        CachedResponse { data: self.entry.payload, is_stale: self.is_stale, cached_at, code, msg }
    }
}

/// Caller-facing response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub data: Value,
    pub is_stale: bool,
    /// When the served data was fetched, if it came from the cache.
    pub cached_at: Option<DateTime<Utc>>,
    pub code: i64,
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::TransportFailure;
    use reelcache_core::{CacheKey, TtlPolicy};
    use serde_json::json;

    fn entry() -> CacheEntry {
        CacheEntry::new(CacheKey::profile("alice"), json!({"user": "alice"}), Utc::now(), TtlPolicy::from_secs(60, 120))
    }

    #[test]
    fn test_fetched_response_has_no_cached_at() {
        let response = Lookup::fetched(entry()).into_response();
        assert_eq!(response.code, 0);
        assert_eq!(response.msg, "success");
        assert!(!response.is_stale);
        assert!(response.cached_at.is_none());
    }

    #[test]
    fn test_cached_response_carries_fetch_time() {
        let entry = entry();
        let fetched_at = entry.fetched_at;
        let response = Lookup::stale_from_cache(entry).into_response();
        assert!(response.is_stale);
        assert_eq!(response.cached_at, Some(fetched_at));
        assert_eq!(response.code, 0);
    }

    #[test]
    fn test_from_cache_classifies_freshness() {
        let entry = entry();
        let fetched_at = entry.fetched_at;

        let lookup = Lookup::from_cache(entry.clone(), fetched_at);
        assert_eq!(lookup.source, Source::Cache);
        assert!(!lookup.is_stale);

        let lookup = Lookup::from_cache(entry, fetched_at + chrono::TimeDelta::seconds(90));
        assert!(lookup.is_stale);
        assert_eq!(lookup.into_response().cached_at, Some(fetched_at));
    }

    #[test]
    fn test_degraded_response_carries_failure() {
        let failure = FetchFailure::Transport(TransportFailure::status(503, b"down"));
        let response = Lookup::degraded(entry(), failure).into_response();
        assert!(response.is_stale);
        assert_eq!(response.code, -1);
        assert!(response.msg.contains("503"));
        assert_eq!(response.data, json!({"user": "alice"}));
    }
}
