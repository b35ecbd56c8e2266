//! Client code for reelcache.
//!
//! This crate provides the upstream fetch pipeline (transport, retry and
//! backoff) and the stale-while-revalidate layer built on top of it.

pub mod fetcher;
pub mod swr;
pub mod transport;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{AttemptOutcome, FetchEvent, FetchObserver, RemoteFetcher, TracingObserver};
pub use swr::{
    BackgroundRefreshScheduler, CacheOrchestrator, CacheTestReport, CachedResponse, FetchCoalescer, Lookup,
    RefreshJob, SchedulerStats, Source,
};
pub use transport::{HttpTransport, Transport, TransportError, TransportRequest};
pub use upstream::{ApiResult, Classification, FetchFailure, PostsPage, UpstreamConfig, UpstreamRequest};
