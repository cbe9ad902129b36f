//! Error types for the codegate crate
//!
//! This module contains all error types that can be returned by gateway operations.
//! Cache failures never appear here; the cache degrades to misses instead.

use thiserror::Error;

use crate::operations::Operation;
use config::ConfigError;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("{operation} failed: {source}")]
    Executor {
        operation: Operation,
        source: anyhow::Error,
    },

    #[error("Failed to clear cache")]
    CacheClearFailed,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
