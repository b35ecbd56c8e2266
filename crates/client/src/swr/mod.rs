//! Stale-while-revalidate layer.
//!
//! [`CacheOrchestrator`] is the entry point. It composes a
//! [`FetchCoalescer`] for per-key single-flight fetches and a
//! [`BackgroundRefreshScheduler`] for refreshes triggered by stale reads.

pub mod coalescer;
pub mod lookup;
pub mod orchestrator;
pub mod scheduler;

pub use coalescer::{CoalesceError, FetchCoalescer};
pub use lookup::{CachedResponse, Lookup, Source};
pub use orchestrator::{CacheOrchestrator, CacheTestReport};
pub use scheduler::{BackgroundRefreshScheduler, RefreshJob, RefreshRunner, SchedulerStats};
