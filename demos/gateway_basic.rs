//! # Basic Gateway Example
//!
//! This example demonstrates the response cache in front of a slow backend:
//! - Connecting to Redis (or running uncached if it is down)
//! - Cache misses vs hits
//! - Cache statistics and clearing

use codegate::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stand-in for a model backend that takes a while to answer
struct SlowBackend;

#[async_trait]
impl OperationExecutor for SlowBackend {
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<CodeOutput> {
        tokio::time::sleep(Duration::from_millis(800)).await;
        Ok(CodeOutput {
            code: "def add(a, b):\n    return a + b".to_string(),
            explanation: format!(
                "Generated {} code based on the prompt: {}",
                request.language, request.prompt
            ),
        })
    }

    async fn explain(&self, request: &ExplainRequest) -> anyhow::Result<Explanation> {
        tokio::time::sleep(Duration::from_millis(800)).await;
        Ok(Explanation {
            explanation: format!("{} lines of {}", request.code.lines().count(), request.language),
        })
    }

    async fn detect_bugs(&self, _request: &BugDetectionRequest) -> anyhow::Result<BugReport> {
        Ok(BugReport { bugs: Vec::new() })
    }

    async fn refactor(&self, request: &RefactorRequest) -> anyhow::Result<CodeOutput> {
        Ok(CodeOutput {
            code: request.code.clone(),
            explanation: "No changes needed".to_string(),
        })
    }

    async fn document(&self, request: &DocumentationRequest) -> anyhow::Result<Documentation> {
        Ok(Documentation {
            documented_code: request.code.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    codegate::logging::init(&config.logging)?;

    println!("🚀 codegate Basic Gateway Example");
    println!("=================================");

    let gateway = Gateway::start(&config, Arc::new(SlowBackend)).await;
    if gateway.cache().is_enabled() {
        println!("✅ Redis cache connected at {}", config.cache.redis_url);
    } else {
        println!("⚠️  Redis unavailable, running without cache");
        println!("💡 Start Redis: docker run -d --name redis -p 6379:6379 redis:7-alpine");
    }

    let request = GenerateRequest {
        prompt: "add two numbers".to_string(),
        language: "python".to_string(),
        context: None,
    };

    for attempt in 1..=2 {
        let started = Instant::now();
        let response = gateway.generate("127.0.0.1", request.clone()).await?;
        println!(
            "Attempt {}: {:?} in {:?}",
            attempt,
            response.explanation.unwrap_or_default(),
            started.elapsed()
        );
    }

    let admin = gateway.admin();
    println!("\n📊 Cache stats: {}", serde_json::to_string(&admin.stats().await)?);

    match admin.clear().await {
        Ok(cleared) => println!("🧹 {}", cleared.message),
        Err(e) => println!("❌ {}", e),
    }

    gateway.shutdown().await;
    Ok(())
}
