//! Background refresh scheduling.
//!
//! Jobs are deduplicated by cache key while pending or running, executed on
//! spawned tasks with bounded concurrency, and never report back to the
//! caller that enqueued them. Failures are logged and counted.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reelcache_core::CacheKey;
use serde::Serialize;
use tokio::sync::{Notify, Semaphore};

use crate::upstream::FetchFailure;

/// A request to re-fetch one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefreshJob {
    key: CacheKey,
}

impl RefreshJob {
    pub fn new(key: CacheKey) -> Self {
        Self { key }
    }

    pub fn profile(username: impl Into<String>) -> Self {
        Self::new(CacheKey::profile(username))
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

/// Executes refresh jobs.
#[async_trait]
pub trait RefreshRunner: Send + Sync + 'static {
    async fn run(&self, job: &RefreshJob) -> Result<(), FetchFailure>;
}

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub accepted: u64,
    pub deduplicated: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub pending: usize,
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU64,
    deduplicated: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

struct Inner {
    runner: Arc<dyn RefreshRunner>,
    pending: Mutex<HashSet<CacheKey>>,
    permits: Arc<Semaphore>,
    counters: Counters,
    idle: Notify,
}

impl Inner {
    fn pending(&self) -> MutexGuard<'_, HashSet<CacheKey>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears a job's pending mark when its task ends, including on panic.
struct PendingMark {
    inner: Arc<Inner>,
    key: CacheKey,
}

impl Drop for PendingMark {
    fn drop(&mut self) {
        let now_idle = {
            let mut pending = self.inner.pending();
            pending.remove(&self.key);
            pending.is_empty()
        };
        if now_idle {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Fire-and-forget refresh queue.
#[derive(Clone)]
pub struct BackgroundRefreshScheduler {
    inner: Arc<Inner>,
}

impl BackgroundRefreshScheduler {
    /// `workers` bounds how many jobs run at once (minimum 1).
    pub fn new(runner: Arc<dyn RefreshRunner>, workers: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                runner,
                pending: Mutex::new(HashSet::new()),
                permits: Arc::new(Semaphore::new(workers.max(1))),
                counters: Counters::default(),
                idle: Notify::new(),
            }),
        }
    }

    /// Enqueue a job. Must be called from within a tokio runtime.
    ///
    /// Returns `false` when a job for the same key is already pending or
    /// running; the new job is dropped.
    pub fn schedule(&self, job: RefreshJob) -> bool {
        if !self.inner.pending().insert(job.key.clone()) {
            self.inner.counters.deduplicated.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %job.key, "refresh already pending");
            return false;
        }
        self.inner.counters.accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %job.key, "refresh scheduled");

        let mark = PendingMark { inner: Arc::clone(&self.inner), key: job.key.clone() };
        tokio::spawn(async move {
            let inner = Arc::clone(&mark.inner);
            let _permit = Arc::clone(&inner.permits).acquire_owned().await.ok();

            match inner.runner.run(&job).await {
                Ok(()) => {
                    inner.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %job.key, "background refresh completed");
                }
                Err(failure) => {
                    inner.counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(key = %job.key, error = %failure, "background refresh failed");
                }
            }
            drop(mark);
        });

        true
    }

    /// Number of jobs pending or running.
    pub fn pending(&self) -> usize {
        self.inner.pending().len()
    }

    pub fn is_pending(&self, key: &CacheKey) -> bool {
        self.inner.pending().contains(key)
    }

    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.inner.counters;
        SchedulerStats {
            accepted: counters.accepted.load(Ordering::Relaxed),
            deduplicated: counters.deduplicated.load(Ordering::Relaxed),
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            pending: self.pending(),
        }
    }

    /// Wait until no job is pending or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.pending().is_empty() {
                return;
            }
            notified.await;
        }
    }
}
