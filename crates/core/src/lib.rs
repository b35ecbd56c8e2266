//! Core types and shared functionality for reelcache.
//!
//! This crate provides:
//! - Cache keys, entries and freshness rules
//! - The `CacheStore` trait with in-memory and SQLite backings
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    CacheDb, CacheEntry, CacheKey, CachePolicy, CacheStore, Freshness, MemoryStore, ResourceKind, TtlPolicy,
};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
