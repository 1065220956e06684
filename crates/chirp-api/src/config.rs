//! Server configuration
//!
//! Read once from the environment at startup:
//!
//! - `STORE_URL`: store address (`memory`, `sqlite::memory:`, `sqlite://path`, path).
//!   `STORE_PROVIDER` may name a different variable to read the address from.
//! - `PAYLOAD_TTL`: retention in seconds (default: 3600)
//! - `DEFAULT_QUERY_LIMIT`: report size when `limit` is omitted (default: 100)
//! - `QUERY_READ_CONCURRENCY`: in-flight point reads per query (default: 64)
//! - `UNKNOWN_PARTITIONS`: `store` or `drop` (default: store)
//! - `HTTP_ADDR`: bind address, or `PORT` for `0.0.0.0:{PORT}` (default: 0.0.0.0:5000)
//! - `SECRET_TOKEN`: HMAC secret for push signatures
//! - `TRAVIS_AUTHS`: `:`-separated build notification tokens
//! - `TRAVIS_AUTH_DISABLED`: skip build token checks when set
//! - `CHIRP_ENV=development`: skip signature and token checks
//! - `MAX_KB`: largest `/kb/:kb` download (default: 1000000)
//! - `PURGE_INTERVAL_SECS`: expired entry reaping interval (default: 60)

use chirp_core::{TrackerConfig, UnknownPartitionPolicy};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: String,
    pub tracker: TrackerConfig,
    pub secret_token: String,
    /// Accepted `Authorization` header values, already prefixed with `token `
    pub build_auth_tokens: Vec<String>,
    pub build_auth_disabled: bool,
    pub development: bool,
    pub max_kb: u64,
    pub purge_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:5000".to_string(),
            tracker: TrackerConfig::default(),
            secret_token: String::new(),
            build_auth_tokens: Vec::new(),
            build_auth_disabled: false,
            development: false,
            max_kb: 1_000_000,
            purge_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let address_var = lookup("STORE_PROVIDER").unwrap_or_else(|| "STORE_URL".to_string());
        let store_address = lookup(address_var.as_str()).unwrap_or(defaults.tracker.store_address);

        let tracker = TrackerConfig {
            store_address,
            retention_secs: parse_var(&lookup, "PAYLOAD_TTL", defaults.tracker.retention_secs)?,
            default_query_limit: parse_var(
                &lookup,
                "DEFAULT_QUERY_LIMIT",
                defaults.tracker.default_query_limit,
            )?,
            query_read_concurrency: parse_var(
                &lookup,
                "QUERY_READ_CONCURRENCY",
                defaults.tracker.query_read_concurrency,
            )?,
            unknown_partitions: parse_var(
                &lookup,
                "UNKNOWN_PARTITIONS",
                UnknownPartitionPolicy::default(),
            )?,
        };

        let http_addr = match (lookup("HTTP_ADDR"), lookup("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => {
                let port: u16 = parse_value("PORT", &port)?;
                format!("0.0.0.0:{}", port)
            }
            (None, None) => defaults.http_addr,
        };

        let build_auth_tokens = lookup("TRAVIS_AUTHS")
            .unwrap_or_default()
            .split(':')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| format!("token {}", token))
            .collect();

        Ok(Self {
            http_addr,
            tracker,
            secret_token: lookup("SECRET_TOKEN").unwrap_or_default(),
            build_auth_tokens,
            build_auth_disabled: lookup("TRAVIS_AUTH_DISABLED").is_some(),
            development: lookup("CHIRP_ENV").as_deref() == Some("development"),
            max_kb: parse_var(&lookup, "MAX_KB", defaults.max_kb)?,
            purge_interval_secs: parse_var(
                &lookup,
                "PURGE_INTERVAL_SECS",
                defaults.purge_interval_secs,
            )?,
        })
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs.max(1))
    }

    /// Whether build notifications skip the token check entirely.
    pub fn build_auth_bypassed(&self) -> bool {
        self.development || self.build_auth_disabled
    }

    pub fn accepts_build_token(&self, authorization: &str) -> bool {
        self.build_auth_tokens.iter().any(|t| t == authorization)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) => parse_value(var, &value),
        None => Ok(default),
    }
}

fn parse_value<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
