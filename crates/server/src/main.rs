//! bimview server entry point.
//!
//! This is the main binary that composes the offline worker, settings, and
//! page monitor, then boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use bimview_client::{FetchClient, FetchConfig, OfflineWorker};
use bimview_core::{AppConfig, CacheDb, PwaMonitor, SettingsService};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tokio::sync::Mutex;
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
    tracing::info!(
        db_path = %config.db_path.display(),
        origin = %config.origin,
        version = %config.cache_version,
        "Starting bimview server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Arc::new(OfflineWorker::new(db.clone(), network, &config)?);
    if worker.resume().await? {
        tracing::info!(version = %config.cache_version, "offline cache already active");
    }

    let settings = SettingsService::open(db, &config.cache_version).await?;
    settings.user_profile().await?;

    let monitor = Arc::new(Mutex::new(PwaMonitor::new(true)));
    tokio::spawn(tools::pwa::forward_worker_events(worker.subscribe(), monitor.clone()));

    let handler = handler::BimViewServer::new(worker.clone(), Arc::new(settings), monitor);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    worker.settle().await;

    Ok(())
}
