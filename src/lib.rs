//! # codegate
//!
//! A request gateway for AI code operations (generate, explain, detect bugs,
//! refactor, document) with a fail-open Redis response cache in front of the
//! model backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codegate::prelude::*;
//! use std::sync::Arc;
//!
//! struct Backend;
//!
//! #[async_trait]
//! impl OperationExecutor for Backend {
//!     async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<CodeOutput> {
//!         Ok(CodeOutput {
//!             code: "print('hello')".to_string(),
//!             explanation: format!("Generated {} code", request.language),
//!         })
//!     }
//!     async fn explain(&self, _: &ExplainRequest) -> anyhow::Result<Explanation> {
//!         anyhow::bail!("not supported")
//!     }
//!     async fn detect_bugs(&self, _: &BugDetectionRequest) -> anyhow::Result<BugReport> {
//!         anyhow::bail!("not supported")
//!     }
//!     async fn refactor(&self, _: &RefactorRequest) -> anyhow::Result<CodeOutput> {
//!         anyhow::bail!("not supported")
//!     }
//!     async fn document(&self, _: &DocumentationRequest) -> anyhow::Result<Documentation> {
//!         anyhow::bail!("not supported")
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     codegate::logging::init(&config.logging)?;
//!
//!     // Falls back to uncached operation if Redis is unreachable
//!     let gateway = Gateway::start(&config, Arc::new(Backend)).await;
//!
//!     let response = gateway
//!         .generate(
//!             "127.0.0.1",
//!             GenerateRequest {
//!                 prompt: "say hello".to_string(),
//!                 language: "python".to_string(),
//!                 context: None,
//!             },
//!         )
//!         .await?;
//!     println!("{:?}", response.code);
//!
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod admin;
pub mod core;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod operations;
pub mod prelude;
pub mod rate_limit;

// Re-export the main public types for convenience
pub use crate::admin::{AdminSurface, ClearResponse};
pub use crate::core::Gateway;
pub use crate::errors::GatewayError;
pub use crate::executor::OperationExecutor;
pub use crate::operations::{CodeResponse, HealthResponse, Operation, OperationRequest};
pub use crate::rate_limit::RateLimiter;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, LoggingConfig, RateLimitConfig, ServerConfig};

// Re-export internal crates used in the public API
pub use cache_system;

// Re-export external dependencies used in public API
pub use async_trait;
