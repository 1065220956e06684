//! Build notification authentication
//!
//! Build notifications carry `Authorization: token <t>`. The header must
//! match one of the configured tokens exactly. The check is skipped in
//! development mode or when build auth is disabled.
//!
//! # Usage
//!
//! ```ignore
//! let build_routes = Router::new()
//!     .route("/travis", post(handlers::travis::receive_build))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         config.clone(),
//!         require_build_token,
//!     ));
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::ApiError;

pub async fn require_build_token(
    State(config): State<Arc<ServerConfig>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if config.build_auth_bypassed() {
        return Ok(next.run(request).await);
    }

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|value| config.accepts_build_token(value));

    if !authorized {
        tracing::warn!(uri = %request.uri(), "Rejected build notification without a valid token");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
