//! Convenience re-exports for common cache-system usage

// Core cache system components
pub use crate::errors::CacheError;
pub use crate::keys::KeyDeriver;
pub use crate::memory::MemoryStore;
pub use crate::params::CacheParams;
pub use crate::redis_store::RedisStore;
pub use crate::service::CacheService;
pub use crate::stats::CacheStats;
pub use crate::store::{CacheStore, KeyScan, StoreInfo};

// Re-export centralized config
pub use config::CacheConfig;

// Common external dependencies
pub use async_trait::async_trait;
pub use redis;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
