//! Build notification endpoint
//!
//! Token authentication runs as route middleware (see [`crate::auth`]).

use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use chirp_core::parse_build_notification;

use super::{extract_payload, observe_webhook};
use crate::{
    error::{ApiError, ErrorResponse},
    models::*,
    AppState,
};

#[utoipa::path(
    post,
    path = "/travis",
    request_body(content = String, description = "Form-encoded `payload=<json>` or a raw JSON body"),
    params(
        ("Authorization" = String, Header, description = "token <build token>")
    ),
    responses(
        (status = 200, description = "Build recorded", body = OkResponse),
        (status = 400, description = "Missing payload or required fields", body = ErrorResponse),
        (status = 401, description = "Missing or unknown build token", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "webhooks"
)]
pub async fn receive_build(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<OkResponse>, ApiError> {
    let result = record_build(&state, &headers, body).await;
    observe_webhook("travis", &result);
    result
}

async fn record_build(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Json<OkResponse>, ApiError> {
    tracing::debug!(bytes = body.len(), "Received build notification");

    let payload = extract_payload(headers, &body)?;
    let notification = parse_build_notification(payload)?;
    let written = state.recorder.record_build(&notification).await?;

    Ok(Json(OkResponse::new("great").with_partitions(written)))
}
