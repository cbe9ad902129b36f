//! Operation requests and results
//!
//! Each request type knows its operation name and which of its fields make
//! up the cache fingerprint. Optional fields are normalized through
//! `CacheParams::with_optional`, so "missing" and "empty" share an entry.

use cache_system::CacheParams;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::GatewayError;

/// The five AI code actions; also the cache namespace discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Generate,
    Explain,
    DetectBugs,
    Refactor,
    Document,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Generate,
        Operation::Explain,
        Operation::DetectBugs,
        Operation::Refactor,
        Operation::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Generate => "generate",
            Operation::Explain => "explain",
            Operation::DetectBugs => "detect_bugs",
            Operation::Refactor => "refactor",
            Operation::Document => "document",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request the gateway can answer from cache
pub trait OperationRequest {
    const OPERATION: Operation;

    /// Result shape stored in and read back from the cache
    type Output: Serialize + DeserializeOwned + Send;

    fn cache_params(&self) -> CacheParams;

    fn validate(&self) -> Result<(), GatewayError>;
}

fn default_language() -> String {
    "python".to_string()
}

fn default_style() -> String {
    "google".to_string()
}

fn require(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugDetectionRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactorRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// google, numpy or sphinx
    #[serde(default = "default_style")]
    pub style: String,
}

/// Code plus a description of it; produced by generate and refactor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeOutput {
    pub code: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    #[serde(default)]
    pub line: Option<u32>,
    /// low, medium, high or critical
    pub severity: String,
    pub description: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugReport {
    #[serde(default)]
    pub bugs: Vec<Bug>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Documentation {
    pub documented_code: String,
}

impl OperationRequest for GenerateRequest {
    const OPERATION: Operation = Operation::Generate;
    type Output = CodeOutput;

    fn cache_params(&self) -> CacheParams {
        CacheParams::new()
            .with("prompt", self.prompt.as_str())
            .with("language", self.language.as_str())
            .with_optional("context", self.context.as_deref())
    }

    fn validate(&self) -> Result<(), GatewayError> {
        require("prompt", &self.prompt)
    }
}

impl OperationRequest for ExplainRequest {
    const OPERATION: Operation = Operation::Explain;
    type Output = Explanation;

    fn cache_params(&self) -> CacheParams {
        CacheParams::new()
            .with("code", self.code.as_str())
            .with("language", self.language.as_str())
    }

    fn validate(&self) -> Result<(), GatewayError> {
        require("code", &self.code)
    }
}

impl OperationRequest for BugDetectionRequest {
    const OPERATION: Operation = Operation::DetectBugs;
    type Output = BugReport;

    fn cache_params(&self) -> CacheParams {
        CacheParams::new()
            .with("code", self.code.as_str())
            .with("language", self.language.as_str())
    }

    fn validate(&self) -> Result<(), GatewayError> {
        require("code", &self.code)
    }
}

impl OperationRequest for RefactorRequest {
    const OPERATION: Operation = Operation::Refactor;
    type Output = CodeOutput;

    fn cache_params(&self) -> CacheParams {
        CacheParams::new()
            .with("code", self.code.as_str())
            .with("language", self.language.as_str())
            .with_optional("instructions", self.instructions.as_deref())
    }

    fn validate(&self) -> Result<(), GatewayError> {
        require("code", &self.code)
    }
}

impl OperationRequest for DocumentationRequest {
    const OPERATION: Operation = Operation::Document;
    type Output = Documentation;

    fn cache_params(&self) -> CacheParams {
        CacheParams::new()
            .with("code", self.code.as_str())
            .with("language", self.language.as_str())
            .with("style", self.style.as_str())
    }

    fn validate(&self) -> Result<(), GatewayError> {
        require("code", &self.code)
    }
}

/// Response returned for every code operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bugs: Option<Vec<Bug>>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub cache_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_names() {
        let names: Vec<&str> = Operation::ALL.iter().map(Operation::as_str).collect();
        assert_eq!(
            names,
            vec!["generate", "explain", "detect_bugs", "refactor", "document"]
        );
        assert_eq!(
            serde_json::to_value(Operation::DetectBugs).unwrap(),
            json!("detect_bugs")
        );
    }

    #[test]
    fn test_request_defaults() {
        let request: DocumentationRequest =
            serde_json::from_value(json!({"code": "def f(): pass"})).unwrap();
        assert_eq!(request.language, "python");
        assert_eq!(request.style, "google");

        let request: GenerateRequest = serde_json::from_value(json!({"prompt": "p"})).unwrap();
        assert_eq!(request.context, None);
    }

    #[test]
    fn test_generate_params_normalize_context() {
        let with_empty = GenerateRequest {
            prompt: "p".to_string(),
            language: "py".to_string(),
            context: Some(String::new()),
        };
        let without = GenerateRequest {
            context: None,
            ..with_empty.clone()
        };
        assert_eq!(with_empty.cache_params(), without.cache_params());
        assert_eq!(without.cache_params().get("context"), Some(""));
    }

    #[test]
    fn test_refactor_params_include_instructions() {
        let request = RefactorRequest {
            code: "x".to_string(),
            language: "rust".to_string(),
            instructions: None,
        };
        let params = request.cache_params();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("instructions"), Some(""));
    }

    #[test]
    fn test_validation() {
        let request = ExplainRequest {
            code: "   ".to_string(),
            language: "python".to_string(),
        };
        assert!(matches!(
            request.validate(),
            Err(GatewayError::InvalidRequest(_))
        ));

        let request = GenerateRequest {
            prompt: "sort a list".to_string(),
            language: "python".to_string(),
            context: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_bug_report_shape() {
        let report: BugReport = serde_json::from_value(json!({
            "bugs": [{"severity": "high", "description": "d", "suggestion": "s"}]
        }))
        .unwrap();
        assert_eq!(report.bugs[0].line, None);

        let response = CodeResponse {
            success: true,
            code: None,
            explanation: Some("e".to_string()),
            bugs: None,
            language: "go".to_string(),
        };
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"success": true, "explanation": "e", "language": "go"})
        );
    }
}
