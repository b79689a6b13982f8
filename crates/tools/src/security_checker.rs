//! Security policy checker: is a library approved for production?

use async_trait::async_trait;
use chrono::Utc;
use genaiops_core::error::ToolError;
use genaiops_core::tool::{parse_arguments, Tool};
use serde::Deserialize;

/// Libraries and components approved for production deployment.
pub const APPROVED_LIBRARIES: &[&str] = &[
    "NeMo Retriever",
    "NVIDIA NIMs",
    "NVIDIA NIM",
    "TensorRT",
    "Triton Inference Server",
    "CUDA Toolkit",
    "cuDNN",
    "RAPIDS",
    "NeMo Framework",
    "NeMo Guardrails",
    "Riva",
    "Metropolis",
    "Clara",
    "Omniverse",
    "DeepStream",
    "TensorRT-LLM",
    "vLLM",
];

pub const POLICY_VERSION: &str = "1.0";

pub struct SecurityPolicyChecker {
    approved: Vec<String>,
}

#[derive(Deserialize)]
struct CheckArgs {
    library_name: String,
}

impl SecurityPolicyChecker {
    pub fn new(approved: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            approved: approved.into_iter().map(Into::into).collect(),
        }
    }

    /// Checker using the built-in approved list.
    pub fn with_default_policy() -> Self {
        Self::new(APPROVED_LIBRARIES.iter().copied())
    }

    pub fn is_approved(&self, library_name: &str) -> bool {
        let normalized = library_name.trim().to_lowercase();
        self.approved.iter().any(|lib| lib.to_lowercase() == normalized)
    }
}

#[async_trait]
impl Tool for SecurityPolicyChecker {
    fn name(&self) -> &str {
        "security_policy_checker"
    }

    fn description(&self) -> &str {
        "Check if a library or component is approved for production deployment according to security policies. Returns approval status and policy information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "library_name": {
                    "type": "string",
                    "description": "Name of the library or component to check (e.g., 'NeMo Retriever', 'TensorRT')"
                }
            },
            "required": ["library_name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: CheckArgs = parse_arguments(arguments)?;
        let approved = self.is_approved(&args.library_name);

        let message = if approved {
            format!("✓ {} is approved for production deployment.", args.library_name)
        } else {
            format!("✗ {} is not approved for production deployment.", args.library_name)
        };

        Ok(serde_json::json!({
            "library_name": args.library_name,
            "is_approved": approved,
            "status": if approved { "APPROVED" } else { "NOT_APPROVED" },
            "policy_version": POLICY_VERSION,
            "checked_at": Utc::now().to_rfc3339(),
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn approved_library() {
        let tool = SecurityPolicyChecker::with_default_policy();
        let data = tool
            .execute(serde_json::json!({"library_name": "NeMo Retriever"}))
            .await
            .unwrap();
        assert_eq!(data["is_approved"], true);
        assert_eq!(data["status"], "APPROVED");
        assert_eq!(data["policy_version"], "1.0");
        assert!(data["message"].as_str().unwrap().contains("is approved"));
    }

    #[tokio::test]
    async fn match_ignores_case_and_whitespace() {
        let tool = SecurityPolicyChecker::with_default_policy();
        let data = tool
            .execute(serde_json::json!({"library_name": "  tensorrt-llm "}))
            .await
            .unwrap();
        assert_eq!(data["is_approved"], true);
        // The name is echoed as given
        assert_eq!(data["library_name"], "  tensorrt-llm ");
    }

    #[tokio::test]
    async fn unknown_library_is_not_approved() {
        let tool = SecurityPolicyChecker::with_default_policy();
        let data = tool
            .execute(serde_json::json!({"library_name": "left-pad"}))
            .await
            .unwrap();
        assert_eq!(data["is_approved"], false);
        assert_eq!(data["status"], "NOT_APPROVED");
    }

    #[tokio::test]
    async fn custom_list() {
        let tool = SecurityPolicyChecker::new(["internal-sdk"]);
        assert!(tool.is_approved("Internal-SDK"));
        assert!(!tool.is_approved("CUDA Toolkit"));
    }

    #[tokio::test]
    async fn missing_argument() {
        let tool = SecurityPolicyChecker::with_default_policy();
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
