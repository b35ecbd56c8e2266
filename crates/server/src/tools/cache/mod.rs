//! Cache management MCP tools.
//!
//! This module provides tools for warming, testing and purging the cache.

pub mod connection;
pub mod purge;
pub mod warm;

pub use connection::{CacheTestParams, test_impl};
pub use purge::{CachePurgeParams, purge_impl};
pub use warm::{CacheWarmParams, warm_impl};
