//! Stale-while-revalidate orchestration.
//!
//! ### Read path
//!
//! 1. Unless forced, read the entry and classify it as fresh, stale or absent.
//! 2. Fresh entries are returned as-is.
//! 3. Stale entries are returned immediately with `is_stale = true` and a
//!    background refresh is scheduled for the key.
//! 4. Absent entries (and forced reads) go through the coalescer: one fetch
//!    per key, written to the store before the shared result is handed out.
//!
//! When that fetch fails, any entry still in the store is served as stale with
//! the failure attached. Only an empty store surfaces the failure as an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use reelcache_core::{CacheEntry, CacheKey, CachePolicy, CacheStore, Error, Freshness, ResourceKind, TtlPolicy};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use super::coalescer::FetchCoalescer;
use super::lookup::Lookup;
use super::scheduler::{BackgroundRefreshScheduler, RefreshJob, RefreshRunner};
use crate::fetcher::RemoteFetcher;
use crate::upstream::{FetchFailure, TransportFailure, UpstreamRequest};

/// How one coalesced fetch-and-write ended.
#[derive(Debug, Clone)]
enum RefreshOutcome {
    /// Fetched and written.
    Stored(CacheEntry),
    /// Fetched, but a newer entry was already stored; carries that entry.
    Superseded(CacheEntry),
    /// Fetched, but the write failed.
    Unstored(CacheEntry),
    Failed(FetchFailure),
}

/// Owned state for one fetch-and-write run.
struct Refresh {
    store: Arc<dyn CacheStore>,
    fetcher: RemoteFetcher,
    key: CacheKey,
    entry_ttl: TtlPolicy,
}

impl Refresh {
    async fn run(self) -> RefreshOutcome {
        let Some(request) = UpstreamRequest::for_key(&self.key, self.fetcher.config().page_size) else {
            return RefreshOutcome::Failed(FetchFailure::Transport(TransportFailure::internal(format!(
                "{} entries are not fetched from upstream",
                self.key.kind()
            ))));
        };

        let started_at = Utc::now();
        let payload = match self.fetcher.fetch(&request).await.into_result() {
            Ok(payload) => payload,
            Err(failure) => return RefreshOutcome::Failed(failure),
        };

        let entry = CacheEntry::new(self.key.clone(), payload, started_at, self.entry_ttl);
        match self.store.put(&entry).await {
            Ok(true) => RefreshOutcome::Stored(entry),
            Ok(false) => match self.store.get(&self.key).await {
                Ok(Some(newer)) => RefreshOutcome::Superseded(newer),
                _ => RefreshOutcome::Unstored(entry),
            },
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to write cache entry");
                RefreshOutcome::Unstored(entry)
            }
        }
    }
}

/// Shared by the orchestrator and its scheduler.
struct Pipeline {
    store: Arc<dyn CacheStore>,
    fetcher: RemoteFetcher,
    coalescer: FetchCoalescer<RefreshOutcome>,
    policy: CachePolicy,
    /// Serializes connection tests, which share the diagnostic key.
    diagnostic_lock: Mutex<()>,
    probe_seq: AtomicU64,
}

impl Pipeline {
    async fn refresh(&self, key: &CacheKey) -> RefreshOutcome {
        let refresh = Refresh {
            store: Arc::clone(&self.store),
            fetcher: self.fetcher.clone(),
            key: key.clone(),
            entry_ttl: self.policy.for_kind(key.kind()),
        };

        match self.coalescer.run_exclusive(key, move || refresh.run()).await {
            Ok(outcome) => outcome,
            Err(e) => RefreshOutcome::Failed(FetchFailure::Transport(TransportFailure::internal(e.to_string()))),
        }
    }

    /// Read an entry, treating a store failure as a miss.
    async fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.store.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }
}

#[async_trait]
impl RefreshRunner for Pipeline {
    async fn run(&self, job: &RefreshJob) -> Result<(), FetchFailure> {
        match self.refresh(job.key()).await {
            RefreshOutcome::Failed(failure) => Err(failure),
            _ => Ok(()),
        }
    }
}

/// Outcome of [`CacheOrchestrator::test_cache_connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheTestReport {
    pub success: bool,
    pub backend: String,
    pub writable: bool,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

/// Cache-first access to upstream resources.
#[derive(Clone)]
pub struct CacheOrchestrator {
    pipeline: Arc<Pipeline>,
    scheduler: BackgroundRefreshScheduler,
}

impl CacheOrchestrator {
    /// `refresh_workers` bounds concurrent background refreshes.
    pub fn new(
        store: Arc<dyn CacheStore>, fetcher: RemoteFetcher, policy: CachePolicy, refresh_workers: usize,
    ) -> Self {
        let pipeline = Arc::new(Pipeline {
            store,
            fetcher,
            coalescer: FetchCoalescer::new(),
            policy,
            diagnostic_lock: Mutex::new(()),
            probe_seq: AtomicU64::new(0),
        });
        let scheduler = BackgroundRefreshScheduler::new(pipeline.clone(), refresh_workers);
        Self { pipeline, scheduler }
    }

    pub async fn get_profile(&self, username: &str, force_refresh: bool) -> Result<Lookup, Error> {
        require_subject("username", username)?;
        self.get(CacheKey::profile(username), force_refresh).await
    }

    /// One page of a user's videos. `None`, `""` and `"0"` all mean the first page.
    pub async fn get_videos(
        &self, username: &str, cursor: Option<&str>, force_refresh: bool,
    ) -> Result<Lookup, Error> {
        require_subject("username", username)?;
        self.get(CacheKey::video_page(username, cursor), force_refresh).await
    }

    pub async fn get_video(&self, video_id: &str, force_refresh: bool) -> Result<Lookup, Error> {
        require_subject("video_id", video_id)?;
        self.get(CacheKey::video_detail(video_id), force_refresh).await
    }

    /// Cache-first read of any fetchable key.
    pub async fn get(&self, key: CacheKey, force_refresh: bool) -> Result<Lookup, Error> {
        if key.kind() == ResourceKind::Diagnostic {
            return Err(Error::InvalidInput("the diagnostic key cannot be read through the cache".into()));
        }

        let cached = if force_refresh { None } else { self.pipeline.read(&key).await };

        if let Some(entry) = &cached {
            match entry.freshness(Utc::now()) {
                Freshness::Fresh => {
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(Lookup::fresh_from_cache(entry.clone()));
                }
                Freshness::Stale => {
                    tracing::debug!(key = %key, "serving stale entry, refreshing in background");
                    self.scheduler.schedule(RefreshJob::new(key));
                    return Ok(Lookup::stale_from_cache(entry.clone()));
                }
                Freshness::Absent => {}
            }
        }

        match self.pipeline.refresh(&key).await {
            RefreshOutcome::Stored(entry) | RefreshOutcome::Unstored(entry) => Ok(Lookup::fetched(entry)),
            RefreshOutcome::Superseded(newer) => Ok(Lookup::from_cache(newer, Utc::now())),
            RefreshOutcome::Failed(failure) => {
                let fallback = match cached {
                    Some(entry) => Some(entry),
                    None => self.pipeline.read(&key).await,
                };
                match fallback {
                    Some(entry) => {
                        tracing::warn!(key = %key, error = %failure, "upstream failed, serving cached entry");
                        Ok(Lookup::degraded(entry, failure))
                    }
                    None => Err(failure.into_error(&key)),
                }
            }
        }
    }

    /// Schedule a profile refresh for every username, regardless of freshness.
    ///
    /// Returns how many jobs the scheduler accepted.
    pub fn warm_trending_profiles_cache<I, S>(&self, usernames: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let accepted = usernames
            .into_iter()
            .filter(|name| !name.as_ref().trim().is_empty())
            .filter(|name| self.scheduler.schedule(RefreshJob::profile(name.as_ref())))
            .count();
        tracing::info!(accepted, "cache warming scheduled");
        accepted
    }

    /// Write-then-read round trip with the diagnostic key.
    pub async fn test_cache_connection(&self) -> CacheTestReport {
        let start = Instant::now();
        let _guard = self.pipeline.diagnostic_lock.lock().await;
        let store = &self.pipeline.store;
        let writable = store.check_writable().await.is_ok();

        let key = CacheKey::diagnostic();
        let now = Utc::now();
        let seq = self.pipeline.probe_seq.fetch_add(1, Ordering::Relaxed);
        let probe = json!({ "probe": now.timestamp_millis(), "seq": seq });
        let entry = CacheEntry::new(key.clone(), probe.clone(), now, self.pipeline.policy.diagnostic);

        let result: Result<(), Error> = async {
            store.put(&entry).await?;
            match store.get(&key).await? {
                Some(read) if read.payload == probe => Ok(()),
                Some(_) => Err(Error::CacheUnavailable("diagnostic read-back did not match the written probe".into())),
                None => Err(Error::CacheUnavailable("diagnostic entry missing after write".into())),
            }
        }
        .await;

        if let Err(e) = store.remove(&key).await {
            tracing::debug!(error = %e, "failed to remove diagnostic entry");
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(()) => CacheTestReport {
                success: true,
                backend: store.backend().to_string(),
                writable,
                elapsed_ms,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "cache connection test failed");
                CacheTestReport {
                    success: false,
                    backend: store.backend().to_string(),
                    writable,
                    elapsed_ms,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Remove one entry.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool, Error> {
        let removed = self.pipeline.store.remove(key).await?;
        tracing::info!(key = %key, removed, "cache entry invalidated");
        Ok(removed)
    }

    /// Evict every entry past its stale window.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let deleted = self.pipeline.store.purge_expired(Utc::now()).await?;
        tracing::info!(deleted, "expired cache entries purged");
        Ok(deleted)
    }

    pub fn scheduler(&self) -> &BackgroundRefreshScheduler {
        &self.scheduler
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.pipeline.policy
    }
}

fn require_subject(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}
