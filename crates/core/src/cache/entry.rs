//! Cache entries and the freshness rules applied to them.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::key::{CacheKey, ResourceKind};

/// The two age thresholds for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Entries younger than this are served without a refresh.
    pub fresh: TimeDelta,
    /// Entries at least this old are treated as absent.
    pub stale: TimeDelta,
}

impl TtlPolicy {
    /// Out-of-range values saturate at `TimeDelta::MAX`.
    pub fn from_secs(fresh: u64, stale: u64) -> Self {
        Self { fresh: saturating_secs(fresh), stale: saturating_secs(stale) }
    }
}

fn saturating_secs(secs: u64) -> TimeDelta {
    i64::try_from(secs).ok().and_then(TimeDelta::try_seconds).unwrap_or(TimeDelta::MAX)
}

/// Freshness windows for every resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub profile: TtlPolicy,
    pub video_page: TtlPolicy,
    pub video_detail: TtlPolicy,
    pub diagnostic: TtlPolicy,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            profile: TtlPolicy::from_secs(60 * 60, 24 * 60 * 60),
            video_page: TtlPolicy::from_secs(30 * 60, 12 * 60 * 60),
            video_detail: TtlPolicy::from_secs(6 * 60 * 60, 7 * 24 * 60 * 60),
            diagnostic: TtlPolicy::from_secs(60, 60),
        }
    }
}

impl CachePolicy {
    pub fn for_kind(&self, kind: ResourceKind) -> TtlPolicy {
        match kind {
            ResourceKind::Profile => self.profile,
            ResourceKind::VideoPage => self.video_page,
            ResourceKind::VideoDetail => self.video_detail,
            ResourceKind::Diagnostic => self.diagnostic,
        }
    }
}

/// Derived freshness of a key at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Stale,
    Absent,
}

/// One cached upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    /// The `data` member of the upstream envelope, kept opaque.
    pub payload: Value,
    pub fetched_at: DateTime<Utc>,
    pub ttl_fresh: TimeDelta,
    pub ttl_stale: TimeDelta,
}

impl CacheEntry {
    pub fn new(key: CacheKey, payload: Value, fetched_at: DateTime<Utc>, ttl: TtlPolicy) -> Self {
        Self { key, payload, fetched_at, ttl_fresh: ttl.fresh, ttl_stale: ttl.stale }
    }

    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.fetched_at
    }

    pub fn freshness(&self, now: DateTime<Utc>) -> Freshness {
        let age = self.age(now);
        if age < self.ttl_fresh {
            Freshness::Fresh
        } else if age < self.ttl_stale {
            Freshness::Stale
        } else {
            Freshness::Absent
        }
    }

    /// Instant after which the entry is eligible for eviction.
    ///
    /// Saturates at `DateTime::<Utc>::MAX_UTC`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.fetched_at.checked_add_signed(self.ttl_stale).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry_aged(secs: i64) -> (CacheEntry, DateTime<Utc>) {
        let now = Utc::now();
        let entry = CacheEntry::new(
            CacheKey::profile("alice"),
            json!({"user": {"uniqueId": "alice"}}),
            now - TimeDelta::seconds(secs),
            TtlPolicy::from_secs(60, 300),
        );
        (entry, now)
    }

    #[test]
    fn test_fresh_within_window() {
        let (entry, now) = entry_aged(59);
        assert_eq!(entry.freshness(now), Freshness::Fresh);
    }

    #[test]
    fn test_stale_at_fresh_boundary() {
        let (entry, now) = entry_aged(60);
        assert_eq!(entry.freshness(now), Freshness::Stale);

        let (entry, now) = entry_aged(299);
        assert_eq!(entry.freshness(now), Freshness::Stale);
    }

    #[test]
    fn test_absent_at_stale_boundary() {
        let (entry, now) = entry_aged(300);
        assert_eq!(entry.freshness(now), Freshness::Absent);
        assert!(entry.is_expired(now));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let ttl = TtlPolicy::from_secs(60, 10_000_000_000_000);
        assert_eq!(ttl.stale, TimeDelta::MAX);
        assert_eq!(TtlPolicy::from_secs(u64::MAX, u64::MAX).fresh, TimeDelta::MAX);

        let now = Utc::now();
        let entry = CacheEntry::new(CacheKey::profile("alice"), json!({}), now, ttl);
        assert_eq!(entry.expires_at(), DateTime::<Utc>::MAX_UTC);
        assert!(!entry.is_expired(now));
        assert_eq!(entry.freshness(now), Freshness::Fresh);
    }

    #[test]
    fn test_future_fetched_at_counts_as_fresh() {
        let (entry, now) = entry_aged(-30);
        assert_eq!(entry.freshness(now), Freshness::Fresh);
    }

    #[test]
    fn test_policy_for_kind() {
        let policy = CachePolicy::default();
        assert_eq!(policy.for_kind(ResourceKind::Profile).fresh, TimeDelta::hours(1));
        assert_eq!(policy.for_kind(ResourceKind::VideoPage).stale, TimeDelta::hours(12));
        assert_eq!(policy.for_kind(ResourceKind::VideoDetail).stale, TimeDelta::days(7));
    }
}
