//! aquanev-sw server entry point.
//!
//! Boots one worker version over SQLite cache storage and the live network,
//! then serves MCP on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use aquanev_core::{CacheDb, WorkerConfig};
use aquanev_worker::{HttpNetwork, NetworkConfig, PageHost, ServiceWorker};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = Arc::new(WorkerConfig::load()?);
    tracing::info!(version = %config.version, scope = %config.scope, "Starting aquanev-sw on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = HttpNetwork::new(NetworkConfig::from(config.as_ref()))?;
    let host = Arc::new(PageHost::new());
    let worker =
        Arc::new(ServiceWorker::new(Arc::clone(&config), Arc::new(db), Arc::new(network), host.clone(), host.clone())?);

    let handler = handler::AquanevServer::new(Arc::clone(&worker), host);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    worker.settle().await;

    Ok(())
}
