//! Push notification endpoint

use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use chirp_core::parse_push_notification;
use chrono::Utc;

use super::{extract_payload, observe_webhook};
use crate::{
    error::{ApiError, ErrorResponse},
    models::*,
    signature, AppState,
};

#[utoipa::path(
    post,
    path = "/github",
    request_body(content = String, description = "Form-encoded `payload=<json>` or a raw JSON body"),
    params(
        ("X-Hub-Signature-256" = Option<String>, Header, description = "sha256=<hex> HMAC of the body"),
        ("X-Hub-Signature" = Option<String>, Header, description = "Legacy sha1=<hex> HMAC of the body")
    ),
    responses(
        (status = 200, description = "Push recorded", body = OkResponse),
        (status = 400, description = "Missing signature, payload, or required fields", body = ErrorResponse),
        (status = 403, description = "Signature mismatch", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "webhooks"
)]
pub async fn receive_push(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<OkResponse>, ApiError> {
    let result = record_push(&state, &headers, body).await;
    observe_webhook("github", &result);
    result
}

async fn record_push(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Json<OkResponse>, ApiError> {
    let received_at = Utc::now();

    if !state.config.development {
        signature::verify_hub_signature(&state.config.secret_token, headers, &body)?;
    }

    tracing::debug!(bytes = body.len(), "Received push notification");

    let payload = extract_payload(headers, &body)?;
    let event = parse_push_notification(payload, received_at)?;
    state.recorder.record_push(&event).await?;

    Ok(Json(OkResponse::new("great")))
}
