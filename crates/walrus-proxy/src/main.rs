//! Walrus Proxy - serves Walrus blobs with browser-friendly headers
//!
//! Images stored on Walrus are fetched through a fixed list of aggregators
//! and returned with a content type and CORS headers so browsers display
//! them inline instead of downloading them.

mod config;
mod error;
mod server;
mod types;

use crate::config::Config;
use crate::error::Result;
use crate::server::{start_server, ServerState, SharedState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};
use walrus_aggregator_client::{BlobFetcher, FetcherOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("walrus_proxy=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Walrus Proxy...");

    let config = Config::from_env()?;
    info!("Port: {}", config.port);
    info!("Proxy path: {}", config.proxy_path);
    info!("Network: {}", config.network);
    for (priority, endpoint) in config.aggregators.iter().enumerate() {
        info!(priority, endpoint = %endpoint, "Aggregator");
    }
    info!("Per-attempt timeout: {:?}", config.fetch_timeout);
    info!("Max blob size: {} bytes", config.max_blob_size);

    let fetcher = BlobFetcher::new(
        config.aggregators.clone(),
        FetcherOptions {
            attempt_timeout: config.fetch_timeout,
            max_blob_size: config.max_blob_size,
            ..FetcherOptions::default()
        },
    )?;

    let port = config.port;
    let state: SharedState = Arc::new(ServerState::new(fetcher, config));

    start_server(state, port).await?;

    Ok(())
}
