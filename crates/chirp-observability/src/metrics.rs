use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Once;

static INIT: Once = Once::new();

lazy_static! {
    /// Global Prometheus metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ingestion metrics

    /// Webhooks received, by source and outcome (accepted / rejected / failed)
    pub static ref WEBHOOKS_RECEIVED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chirp_webhooks_received_total", "Total webhook notifications received"),
        &["source", "outcome"]
    ).expect("metric can be created");

    /// Events persisted to the store, by source
    pub static ref EVENTS_RECORDED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chirp_events_recorded_total", "Total events recorded"),
        &["source"]
    ).expect("metric can be created");

    /// Build partitions persisted to the store
    pub static ref BUILD_PARTITIONS_RECORDED_TOTAL: IntCounter = IntCounter::new(
        "chirp_build_partitions_recorded_total",
        "Total build partitions recorded"
    ).expect("metric can be created");

    /// Build partitions skipped by the unknown-partition policy
    pub static ref BUILD_PARTITIONS_DROPPED_TOTAL: IntCounter = IntCounter::new(
        "chirp_build_partitions_dropped_total",
        "Total build partitions dropped because their id was unknown"
    ).expect("metric can be created");

    // query metrics

    /// Chirp report queries served
    pub static ref QUERIES_TOTAL: IntCounter = IntCounter::new(
        "chirp_queries_total",
        "Total chirp report queries"
    ).expect("metric can be created");

    /// Query latency
    pub static ref QUERY_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new("chirp_query_latency_seconds", "Chirp query latency in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["filtered"]
    ).expect("metric can be created");


    // store metrics

    /// Store operation errors, by operation
    pub static ref STORE_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chirp_store_errors_total", "Total key/value store errors"),
        &["operation"]
    ).expect("metric can be created");

    /// Expired entries reclaimed by the reaper
    pub static ref STORE_PURGED_TOTAL: IntCounter = IntCounter::new(
        "chirp_store_purged_total",
        "Total expired entries purged from the store"
    ).expect("metric can be created");
}

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn init() {
    INIT.call_once(|| {
        let collectors: Vec<Box<dyn Collector>> = vec![
            Box::new(WEBHOOKS_RECEIVED_TOTAL.clone()),
            Box::new(EVENTS_RECORDED_TOTAL.clone()),
            Box::new(BUILD_PARTITIONS_RECORDED_TOTAL.clone()),
            Box::new(BUILD_PARTITIONS_DROPPED_TOTAL.clone()),
            Box::new(QUERIES_TOTAL.clone()),
            Box::new(QUERY_LATENCY.clone()),
            Box::new(STORE_ERRORS_TOTAL.clone()),
            Box::new(STORE_PURGED_TOTAL.clone()),
        ];
        for collector in collectors {
            REGISTRY
                .register(collector)
                .expect("chirp metric names are unique");
        }
    });
}
