//! Stale-while-revalidate cache storage.
//!
//! This module provides the cache data model and its backings:
//!
//! - Composite cache keys with first-page cursor canonicalization
//! - Entries carrying fresh/stale windows and derived freshness
//! - The `CacheStore` trait, an in-memory store and a SQLite store
//!   (WAL mode, automatic migrations, SHA-256 key digests)

pub mod connection;
pub mod entries;
pub mod entry;
pub mod hash;
pub mod key;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::{CacheEntry, CachePolicy, Freshness, TtlPolicy};
pub use key::{CacheKey, ResourceKind, normalize_cursor};
pub use memory::MemoryStore;
pub use store::CacheStore;
