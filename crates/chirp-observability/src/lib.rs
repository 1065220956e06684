//! Metrics for the chirp tracker.
//!
//! [`metrics`] holds the counters and histograms touched by ingestion,
//! queries and the store reaper. [`exporter`] serves them at `/metrics`.
//!
//! ```no_run
//! chirp_observability::init();
//! let metrics_router: axum::Router = chirp_observability::exporter::create_metrics_router();
//! ```

pub mod exporter;
pub mod metrics;

pub use metrics::REGISTRY;

/// Register all metrics. Idempotent.
pub fn init() {
    metrics::init();
}
