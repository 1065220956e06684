//! Chirp Tracker Server Binary
//!
//! # Environment Variables
//!
//! - `STORE_URL`: store address (default: memory); `STORE_PROVIDER` names an alternative variable
//! - `PAYLOAD_TTL`: retention in seconds (default: 3600)
//! - `HTTP_ADDR` / `PORT`: bind address (default: 0.0.0.0:5000)
//! - `SECRET_TOKEN`: push signature secret
//! - `TRAVIS_AUTHS`: `:`-separated build tokens
//! - `TRAVIS_AUTH_DISABLED`: disable build token checks
//! - `CHIRP_ENV=development`: disable signature and token checks
//! - `UNKNOWN_PARTITIONS`: `store` or `drop` (default: store)
//! - `DEFAULT_QUERY_LIMIT` / `QUERY_READ_CONCURRENCY`: chirp report tuning
//! - `MAX_KB`: largest `/kb/:kb` transfer (default: 1000000)
//! - `PURGE_INTERVAL_SECS`: expiry reaper interval (default: 60)
//! - `RUST_LOG`: log filter (default: info)
//!
//! # Example
//!
//! ```bash
//! export STORE_URL=sqlite://./data/chirps.db
//! export SECRET_TOKEN=hunter2
//! export TRAVIS_AUTHS=abc123:def456
//! cargo run --bin chirp-tracker
//! ```

use chirp_api::{
    create_router, reaper, serve, shutdown_signal, AppState, ServerConfig, ShutdownHandle,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Chirp tracker starting");

    let config = ServerConfig::from_env()?;

    info!("Configuration:");
    info!("  Store: {}", config.tracker.store_address);
    info!("  Payload TTL: {}s", config.tracker.retention_secs);
    info!("  HTTP: {}", config.http_addr);
    info!("  Unknown partitions: {:?}", config.tracker.unknown_partitions);
    info!("  Build tokens: {}", config.build_auth_tokens.len());
    if config.development {
        info!("  Development mode: signature and token checks disabled");
    } else if config.build_auth_disabled {
        info!("  Build token checks disabled");
    }

    chirp_observability::init();

    let store = chirp_store::connect(&config.tracker.store_address).await?;
    info!("Store connected");

    let shutdown = ShutdownHandle::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let signal = shutdown_signal().await;
            shutdown.trigger(signal);
        }
    });

    let reaper = reaper::spawn_reaper(store.clone(), config.purge_interval(), shutdown.clone());

    let http_addr = config.http_addr.clone();
    let router = create_router(AppState::new(store, config));

    serve(router, &http_addr, shutdown).await?;

    if let Err(e) = reaper.await {
        tracing::warn!("Expiry reaper ended abnormally: {}", e);
    }

    info!("Chirp tracker stopped");
    Ok(())
}
