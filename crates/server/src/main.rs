//! stash server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use stash_client::{FetchConfig, HttpFetcher};
use stash_core::{AppConfig, BackendKind, CacheDb, CacheStore, InMemoryMessages, LifecycleManager};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let worker = config.worker_config()?;

    let store = match config.backend {
        BackendKind::Sqlite => {
            let db = CacheDb::open(&config.db_path)
                .await
                .map_err(|e| anyhow!("failed to open cache at {}: {e}", config.db_path.display()))?;
            CacheStore::new(db)
        }
        BackendKind::Memory => CacheStore::in_memory(),
    };

    let fetcher = HttpFetcher::new(FetchConfig::from(&config)).map_err(|e| anyhow!("{e}"))?;
    let manager = Arc::new(LifecycleManager::new(worker, store, Arc::new(fetcher)));

    if config.install_on_start {
        match manager.install().await {
            Ok(state) => tracing::info!(%state, "worker installed"),
            Err(e) => tracing::error!(error = %e, "install failed, serving in passthrough mode"),
        }
    }

    tracing::info!(origin = %config.origin, backend = ?config.backend, "Starting stash server on stdio transport");

    let handler = handler::StashServer::new(manager, Arc::new(InMemoryMessages::new()));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
