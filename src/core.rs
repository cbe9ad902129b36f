//! Core gateway functionality
//!
//! This module contains the Gateway struct, which validates and rate-limits
//! incoming code operations, answers them from the response cache when it
//! can, and otherwise calls the executor and caches the result.

use cache_system::CacheService;
use config::{AppConfig, ServerConfig};
use std::future::Future;
use std::sync::Arc;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::admin::AdminSurface;
use crate::errors::GatewayError;
use crate::executor::OperationExecutor;
use crate::operations::{
    BugDetectionRequest, CodeResponse, DocumentationRequest, ExplainRequest, GenerateRequest,
    HealthResponse, OperationRequest, RefactorRequest,
};
use crate::rate_limit::RateLimiter;

/// Request dispatcher shared by all handlers
pub struct Gateway {
    server: ServerConfig,
    cache: Arc<CacheService>,
    limiter: RateLimiter,
    executor: Arc<dyn OperationExecutor>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("service", &self.server.project_name)
            .field("cache", &self.cache)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl Gateway {
    /// Assemble a gateway from already-built parts
    pub fn new(
        config: &AppConfig,
        cache: Arc<CacheService>,
        executor: Arc<dyn OperationExecutor>,
    ) -> Self {
        Self {
            server: config.server.clone(),
            cache,
            limiter: RateLimiter::new(&config.rate_limit),
            executor,
        }
    }

    /// Build the Redis-backed cache, connect it and return a ready gateway.
    ///
    /// An unreachable Redis is not an error: the gateway starts with caching disabled.
    pub async fn start(config: &AppConfig, executor: Arc<dyn OperationExecutor>) -> Self {
        let cache = Arc::new(CacheService::from_config(config.cache.clone()));
        cache.connect().await;
        Self::new(config, cache, executor)
    }

    /// Release the cache connection
    pub async fn shutdown(&self) {
        self.cache.disconnect().await;
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    pub fn admin(&self) -> AdminSurface {
        AdminSurface::new(self.cache.clone())
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "healthy".to_string(),
            version: self.server.version.clone(),
            service: self.server.project_name.clone(),
            cache_enabled: self.cache.is_enabled(),
        }
    }

    /// Validate, rate-limit, then serve from cache or compute and cache
    async fn run<R, F, Fut>(
        &self,
        client: &str,
        request: &R,
        compute: F,
    ) -> Result<R::Output, GatewayError>
    where
        R: OperationRequest,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<R::Output>>,
    {
        let operation = R::OPERATION;
        let span = info_span!(
            "operation",
            operation = %operation,
            request_id = %Uuid::new_v4()
        );

        async move {
            request.validate()?;
            self.limiter.check(client)?;

            let params = request.cache_params();
            if let Some(cached) = self.cache.get::<R::Output>(operation.as_str(), &params).await {
                crate::debug_log!("Serving {} from cache", operation);
                return Ok(cached);
            }

            let output = compute()
                .await
                .map_err(|source| GatewayError::Executor { operation, source })?;

            self.cache.set(operation.as_str(), &output, None, &params).await;
            crate::trace_log!("Computed {} result", operation);

            Ok(output)
        }
        .instrument(span)
        .await
    }

    pub async fn generate(
        &self,
        client: &str,
        request: GenerateRequest,
    ) -> Result<CodeResponse, GatewayError> {
        let output = self
            .run(client, &request, || self.executor.generate(&request))
            .await?;

        Ok(CodeResponse {
            success: true,
            code: Some(output.code),
            explanation: Some(output.explanation),
            bugs: None,
            language: request.language,
        })
    }

    pub async fn explain(
        &self,
        client: &str,
        request: ExplainRequest,
    ) -> Result<CodeResponse, GatewayError> {
        let output = self
            .run(client, &request, || self.executor.explain(&request))
            .await?;

        Ok(CodeResponse {
            success: true,
            code: Some(request.code),
            explanation: Some(output.explanation),
            bugs: None,
            language: request.language,
        })
    }

    pub async fn detect_bugs(
        &self,
        client: &str,
        request: BugDetectionRequest,
    ) -> Result<CodeResponse, GatewayError> {
        let output = self
            .run(client, &request, || self.executor.detect_bugs(&request))
            .await?;

        Ok(CodeResponse {
            success: true,
            code: Some(request.code),
            explanation: Some(format!("Found {} potential issue(s)", output.bugs.len())),
            bugs: Some(output.bugs),
            language: request.language,
        })
    }

    pub async fn refactor(
        &self,
        client: &str,
        request: RefactorRequest,
    ) -> Result<CodeResponse, GatewayError> {
        let output = self
            .run(client, &request, || self.executor.refactor(&request))
            .await?;

        Ok(CodeResponse {
            success: true,
            code: Some(output.code),
            explanation: Some(output.explanation),
            bugs: None,
            language: request.language,
        })
    }

    pub async fn document(
        &self,
        client: &str,
        request: DocumentationRequest,
    ) -> Result<CodeResponse, GatewayError> {
        let output = self
            .run(client, &request, || self.executor.document(&request))
            .await?;

        Ok(CodeResponse {
            success: true,
            code: Some(output.documented_code),
            explanation: Some(format!(
                "Documentation added using {} style",
                request.style
            )),
            bugs: None,
            language: request.language,
        })
    }
}
