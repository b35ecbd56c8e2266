//! The storage seam behind the stale-while-revalidate cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entry::CacheEntry;
use super::key::CacheKey;
use crate::Error;

/// Key/value storage for cache entries.
///
/// Implementations must be safe for concurrent use and must never let a
/// `put` replace an entry whose `fetched_at` is newer than the incoming one.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the entry for `key`, expired or not.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error>;

    /// Insert or replace the entry for its key.
    ///
    /// Returns `false` without writing when the stored entry is newer.
    async fn put(&self, entry: &CacheEntry) -> Result<bool, Error>;

    async fn exists(&self, key: &CacheKey) -> Result<bool, Error>;

    /// Remove the entry for `key`. Returns whether one existed.
    async fn remove(&self, key: &CacheKey) -> Result<bool, Error>;

    /// Evict every entry whose stale window has passed at `now`.
    ///
    /// Returns the number of deleted entries.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;

    /// Check that the backing medium accepts writes.
    async fn check_writable(&self) -> Result<(), Error>;

    /// Short name of the backing, for diagnostics.
    fn backend(&self) -> &'static str;
}
