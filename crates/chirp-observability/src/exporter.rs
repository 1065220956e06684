//! `/metrics` endpoint in the Prometheus text exposition format.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};

use crate::metrics::REGISTRY;

/// Path the exposition is served on.
pub const METRICS_PATH: &str = "/metrics";

/// Encode every family gathered from [`REGISTRY`].
pub fn render() -> Result<(String, Vec<u8>), prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut exposition = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut exposition)?;
    Ok((encoder.format_type().to_string(), exposition))
}

pub async fn metrics_handler() -> Response {
    match render() {
        Ok((content_type, exposition)) => {
            ([(header::CONTENT_TYPE, content_type)], exposition).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {}", e),
        )
            .into_response(),
    }
}

/// Router serving [`METRICS_PATH`], mergeable into any application state.
pub fn create_metrics_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(METRICS_PATH, get(metrics_handler))
}
