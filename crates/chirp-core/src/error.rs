//! Tracker Error Types
//!
//! ## Error Categories
//!
//! ### Validation Errors
//! - Inbound notification missing required fields (`repository`, `commit`, ...)
//! - Key components containing the `:` delimiter
//! - Malformed query parameters (non-numeric limit)
//!
//! ### Parse Errors
//! - Notification body is not well-formed JSON
//! - A stored key does not follow the key scheme
//!
//! ### Store Errors
//! - The key/value store is unreachable or failed; never retried here
//!
//! Validation and parse errors are always raised before the first store write.

use chirp_store::StoreError;
use thiserror::Error;

use crate::keys::KeyError;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TrackerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TrackerError::Validation(msg.into())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, TrackerError::Validation(_) | TrackerError::Parse(_))
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Parse(e.to_string())
    }
}

impl From<KeyError> for TrackerError {
    fn from(e: KeyError) -> Self {
        match e {
            KeyError::InvalidComponent { .. } => TrackerError::Validation(e.to_string()),
            KeyError::Malformed(_) => TrackerError::Parse(e.to_string()),
        }
    }
}
