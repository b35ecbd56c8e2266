//! In-memory cache store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::store::CacheStore;
use crate::Error;

/// Process-local cache store.
///
/// Uses a HashMap behind a tokio RwLock; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<bool, Error> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&entry.key)
            && existing.fetched_at > entry.fetched_at
        {
            tracing::debug!(key = %entry.key, "discarding write older than stored entry");
            return Ok(false);
        }
        entries.insert(entry.key.clone(), entry.clone());
        Ok(true)
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool, Error> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, Error> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok((before - entries.len()) as u64)
    }

    async fn check_writable(&self) -> Result<(), Error> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
