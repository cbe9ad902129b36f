//! The AI backend seam
//!
//! Implementations own prompts, model calls and output parsing. The gateway
//! only decides whether to call them at all.

use async_trait::async_trait;

use crate::operations::{
    BugDetectionRequest, BugReport, CodeOutput, DocumentationRequest, Documentation,
    ExplainRequest, Explanation, GenerateRequest, RefactorRequest,
};

/// Performs the expensive, billable model call for each operation
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<CodeOutput>;

    async fn explain(&self, request: &ExplainRequest) -> anyhow::Result<Explanation>;

    async fn detect_bugs(&self, request: &BugDetectionRequest) -> anyhow::Result<BugReport>;

    async fn refactor(&self, request: &RefactorRequest) -> anyhow::Result<CodeOutput>;

    async fn document(&self, request: &DocumentationRequest) -> anyhow::Result<Documentation>;
}
