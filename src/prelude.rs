//! Convenience re-exports for common codegate usage
//!
//! This prelude module re-exports the most commonly used items,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use codegate::prelude::*;
//!
//! // Now you have access to the gateway, request types and cache service
//! let params = CacheParams::new().with("code", "x = 1");
//! assert_eq!(params.len(), 1);
//! ```

// Core gateway components
pub use crate::admin::{AdminSurface, ClearResponse};
pub use crate::core::Gateway;
pub use crate::errors::GatewayError;
pub use crate::executor::OperationExecutor;
pub use crate::operations::{
    Bug, BugDetectionRequest, BugReport, CodeOutput, CodeResponse, DocumentationRequest,
    Documentation, ExplainRequest, Explanation, GenerateRequest, HealthResponse, Operation,
    OperationRequest, RefactorRequest,
};
pub use crate::rate_limit::RateLimiter;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, LogFormat, LoggingConfig, RateLimitConfig};

// Re-export cache system
pub use cache_system::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait::async_trait;
pub use tokio;
