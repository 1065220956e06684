//! HTTP error mapping
//!
//! | error                      | status |
//! |----------------------------|--------|
//! | validation / parse         | 400    |
//! | missing signature/payload  | 400    |
//! | bad request                | 400    |
//! | unauthorized build token   | 401    |
//! | signature mismatch         | 403    |
//! | store failure              | 503    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chirp_core::TrackerError;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("unauthorized")]
    Unauthorized,

    #[error("No github signature")]
    MissingSignature,

    #[error("Signatures didn't match!")]
    SignatureMismatch,

    #[error("missing payload")]
    MissingPayload,

    #[error("{0}")]
    BadRequest(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Tracker(TrackerError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Tracker(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::SignatureMismatch => StatusCode::FORBIDDEN,
            ApiError::MissingSignature | ApiError::MissingPayload | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Tracker(TrackerError::Store(e)) => {
                tracing::error!(error = %e, "Store unavailable");
            }
            ApiError::Tracker(TrackerError::Parse(msg)) => {
                tracing::debug!(error = %msg, "Rejected unparseable request");
            }
            _ => {
                tracing::debug!(error = %self, status = status.as_u16(), "Rejected request");
            }
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_store::StoreError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(TrackerError::validation("x")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TrackerError::Parse("x".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TrackerError::Store(StoreError::InvalidTtl)).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::MissingSignature.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::SignatureMismatch.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::MissingPayload.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
