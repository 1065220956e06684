//! Store Error Types
//!
//! ## Error Categories
//!
//! - `Database`: SQLite operation failed (connection, query, pool)
//! - `Migration`: schema migration could not be applied
//! - `InvalidTtl`: a write asked for a zero time-to-live
//! - `InvalidAddress`: the connection address names no supported backend
//!
//! None of these are retried inside the store; callers decide whether to
//! reject the request or let an upstream webhook retry.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("TTL must be greater than zero")]
    InvalidTtl,

    #[error("Invalid store address: {0}")]
    InvalidAddress(String),
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(e.to_string())
    }
}
