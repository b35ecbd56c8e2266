//! Per-key fetch coalescing.
//!
//! The first caller for a key spawns the work on its own task and registers a
//! shared handle to it. Callers arriving while it runs await the same handle.
//! The task deregisters the key when it finishes, even if the work panics, so
//! a cancelled caller never strands the key and a later caller never reuses a
//! finished result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reelcache_core::CacheKey;

/// The coalesced task did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoalesceError {
    #[error("coalesced fetch panicked")]
    Panicked,
    #[error("coalesced fetch was cancelled")]
    Cancelled,
}

impl From<tokio::task::JoinError> for CoalesceError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() { CoalesceError::Panicked } else { CoalesceError::Cancelled }
    }
}

type Inflight<T> = Shared<BoxFuture<'static, Result<T, CoalesceError>>>;

type Registry<T> = Arc<Mutex<HashMap<CacheKey, (u64, Inflight<T>)>>>;

/// Guarantees at most one in-flight unit of work per [`CacheKey`].
pub struct FetchCoalescer<T> {
    inflight: Registry<T>,
    generation: AtomicU64,
}

impl<T> Default for FetchCoalescer<T> {
    fn default() -> Self {
        Self { inflight: Arc::new(Mutex::new(HashMap::new())), generation: AtomicU64::new(0) }
    }
}

/// Removes a registration when the owning task ends.
struct Deregister<T> {
    registry: Registry<T>,
    key: CacheKey,
    generation: u64,
}

impl<T> Drop for Deregister<T> {
    fn drop(&mut self) {
        let mut inflight = lock(&self.registry);
        if inflight.get(&self.key).is_some_and(|(generation, _)| *generation == self.generation) {
            inflight.remove(&self.key);
        }
    }
}

fn lock<T>(registry: &Registry<T>) -> MutexGuard<'_, HashMap<CacheKey, (u64, Inflight<T>)>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> FetchCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join the run already in flight.
    ///
    /// `work` is only invoked when no run is in flight. Every caller of one
    /// run receives a clone of the same result.
    pub async fn run_exclusive<F, Fut>(&self, key: &CacheKey, work: F) -> Result<T, CoalesceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(key) {
                Some((_, existing)) => {
                    tracing::debug!(key = %key, "joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    let guard = Deregister { registry: Arc::clone(&self.inflight), key: key.clone(), generation };
                    let fut = work();
                    let handle = tokio::spawn(async move {
                        let _guard = guard;
                        fut.await
                    });
                    let shared = handle.map(|joined| joined.map_err(CoalesceError::from)).boxed().shared();
                    inflight.insert(key.clone(), (generation, shared.clone()));
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of keys with a run in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }

    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        lock(&self.inflight).contains_key(key)
    }
}
