//! Expired entry reaper
//!
//! Expired entries are already invisible to reads; the reaper only reclaims
//! the space they hold by calling `purge_expired` on an interval until
//! shutdown.

use chirp_observability::metrics;
use chirp_store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::shutdown::ShutdownHandle;

pub fn spawn_reaper(
    store: Arc<dyn KeyValueStore>,
    interval: Duration,
    mut shutdown: ShutdownHandle,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        tracing::info!(interval_secs = interval.as_secs(), "Expiry reaper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => reap(store.as_ref()).await,
                signal = shutdown.wait() => {
                    tracing::info!("Expiry reaper stopping ({})", signal);
                    break;
                }
            }
        }
    })
}

async fn reap(store: &dyn KeyValueStore) {
    match store.purge_expired().await {
        Ok(0) => {}
        Ok(removed) => {
            metrics::STORE_PURGED_TOTAL.inc_by(removed);
            tracing::debug!(removed, "Purged expired entries");
        }
        Err(e) => {
            metrics::STORE_ERRORS_TOTAL
                .with_label_values(&["purge"])
                .inc();
            tracing::warn!("Failed to purge expired entries: {}", e);
        }
    }
}
