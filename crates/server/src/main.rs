//! reelcache server entry point.
//!
//! Loads configuration, opens the cache store and boots the MCP server on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use reelcache_client::{CacheOrchestrator, RemoteFetcher, UpstreamConfig};
use reelcache_core::{AppConfig, CacheDb, CacheStore, MemoryStore};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

/// Open the configured store: SQLite when `db_path` is set, memory otherwise.
async fn open_store(config: &AppConfig) -> Result<Arc<dyn CacheStore>> {
    match &config.db_path {
        Some(path) => {
            let db = CacheDb::open(path)
                .await
                .with_context(|| format!("failed to open cache database at {}", path.display()))?;
            tracing::info!(path = %path.display(), "using SQLite cache store");
            Ok(Arc::new(db))
        }
        None => {
            tracing::info!("no db_path configured, using in-memory cache store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    tracing::info!(base_url = %config.base_url, "Starting reelcache server on stdio transport");

    let store = open_store(&config).await?;
    let fetcher = RemoteFetcher::http(UpstreamConfig::from_app(&config)).context("failed to build HTTP client")?;
    let orchestrator = CacheOrchestrator::new(store, fetcher, config.cache_policy(), config.refresh_workers);

    let handler = handler::ReelcacheServer::new(orchestrator, config.trending_profiles.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
