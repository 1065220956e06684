//! Health check endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{models::HealthResponse, AppState};

/// Key probed by the readiness check; it never exists.
const READINESS_PROBE_KEY: &str = "chirp:readiness";

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Liveness probe endpoint
/// Returns 200 OK if the process is running
#[utoipa::path(
    get,
    path = "/live",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn liveness_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe endpoint
/// Returns 200 OK once the key/value store answers reads
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Store unavailable")
    ),
    tag = "health"
)]
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    match state.store.get(READINESS_PROBE_KEY).await {
        Ok(_) => Ok(Json(HealthResponse {
            status: "ok".to_string(),
        })),
        Err(e) => {
            tracing::warn!("Readiness check failed: store unavailable: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
