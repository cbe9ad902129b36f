//! Error types for cache operations
//!
//! This module defines all error types that can occur
//! during cache operations and store interactions.

use thiserror::Error;

/// Cache system errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Cache store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode cache value: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode cached value: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

impl CacheError {
    /// Whether the error came from the link to the backing store
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            CacheError::Connection(_) | CacheError::Unavailable(_) | CacheError::Timeout
        )
    }
}
