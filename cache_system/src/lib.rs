//! Response cache for AI code operations
//!
//! This crate provides a Redis-backed, TTL-bounded cache that is
//! best-effort and fail-open: store failures degrade to cache misses.

pub mod codec;
pub mod errors;
pub mod keys;
pub mod memory;
pub mod params;
pub mod prelude;
pub mod redis_store;
pub mod service;
pub mod stats;
pub mod store;

// Re-export centralized config
pub use config::CacheConfig;

pub use errors::CacheError;
pub use keys::KeyDeriver;
pub use memory::MemoryStore;
pub use params::CacheParams;
pub use redis_store::RedisStore;
pub use service::CacheService;
pub use stats::CacheStats;
pub use store::{CacheStore, KeyScan, ScanPage, StoreInfo};
