//! Tool trait and registry: the agent's capabilities.
//!
//! Tools are registered by name and dispatched with the raw JSON argument
//! string the reasoner produced. The registry is the failure boundary: unknown
//! names, malformed arguments, tool errors and tool panics all come back as a
//! failed [`ToolResult`] instead of an error, so a single bad call can never
//! take the run down.

use async_trait::async_trait;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The result of a tool execution.
///
/// `error` is set exactly when `success` is false. Both `data` and `error`
/// are always serialized, as `null` when absent, so every result the reasoner
/// reads has the same keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// Structured output on success
    #[serde(default)]
    pub data: Option<serde_json::Value>,

    /// Failure message
    #[serde(default)]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: serde_json::Value) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()) }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::failure(err.to_string())
    }
}

/// The core Tool trait.
///
/// Implementations receive already-parsed JSON arguments (always an object)
/// and return their structured output.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "cost_estimator").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Deserialize tool arguments into a typed struct.
pub fn parse_arguments<T: DeserializeOwned>(arguments: serde_json::Value) -> std::result::Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// A registry of available tools, kept in registration order.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                debug!(tool = %name, "Replacing registered tool");
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    /// All tool definitions, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a call by name with the raw JSON argument string.
    ///
    /// Never fails: every problem is reported as a failed `ToolResult`.
    pub async fn execute(&self, name: &str, raw_arguments: &str) -> ToolResult {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "Unknown tool requested");
            return ToolError::NotFound(name.to_string()).into();
        };

        let arguments = match parse_raw_arguments(raw_arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = %name, error = %e, "Rejected tool arguments");
                return e.into();
            }
        };

        let outcome = AssertUnwindSafe(tool.execute(arguments)).catch_unwind().await;
        match outcome {
            Ok(Ok(data)) => ToolResult::ok(data),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                e.into()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(tool = %name, panic = %message, "Tool panicked");
                ToolError::Panicked { tool_name: name.to_string(), message }.into()
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_raw_arguments(raw: &str) -> std::result::Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    if !value.is_object() {
        return Err(ToolError::InvalidArguments(format!(
            "expected a JSON object, got {raw}"
        )));
    }
    Ok(value)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            let args: EchoArgs = parse_arguments(arguments)?;
            Ok(json!({ "echo": args.text }))
        }
    }

    struct LoudEchoTool;

    #[async_trait]
    impl Tool for LoudEchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input, loudly" }
        fn parameters_schema(&self) -> serde_json::Value { json!({"type": "object"}) }
        async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            let args: EchoArgs = parse_arguments(arguments)?;
            Ok(json!({ "echo": args.text.to_uppercase() }))
        }
    }

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str { self.0 }
        fn description(&self) -> &str { "no-op" }
        fn parameters_schema(&self) -> serde_json::Value { json!({"type": "object"}) }
        async fn execute(&self, _arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            Ok(json!({}))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str { "explode" }
        fn description(&self) -> &str { "Always panics" }
        fn parameters_schema(&self) -> serde_json::Value { json!({"type": "object"}) }
        async fn execute(&self, _arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            panic!("boom");
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str { "flaky" }
        fn description(&self) -> &str { "Always fails" }
        fn parameters_schema(&self) -> serde_json::Value { json!({"type": "object"}) }
        async fn execute(&self, _arguments: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "flaky".into(),
                reason: "backend offline".into(),
            })
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn definitions_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NamedTool("zeta")));
        registry.register(Box::new(NamedTool("alpha")));
        registry.register(Box::new(NamedTool("mid")));
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn reregistration_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry.register(Box::new(NamedTool("other")));
        registry.register(Box::new(LoudEchoTool));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["echo", "other"]);
        assert_eq!(registry.definitions()[0].description, "Echoes back the input, loudly");

        let result = registry.execute("echo", r#"{"text": "hi"}"#).await;
        assert_eq!(result.data, Some(json!({"echo": "HI"})));
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let result = registry.execute("echo", r#"{"text": "hello world"}"#).await;
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.data, Some(json!({"echo": "hello world"})));
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let result = registry.execute("nonexistent", "{}").await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Tool not found: nonexistent"));
    }

    #[tokio::test]
    async fn malformed_json_becomes_failure() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let result = registry.execute("echo", "{not json").await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Invalid tool arguments"));
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let result = registry.execute("echo", "[1, 2]").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("expected a JSON object"));
    }

    #[tokio::test]
    async fn empty_arguments_mean_empty_object() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NamedTool("noop")));
        let result = registry.execute("noop", "  ").await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn missing_required_field_is_invalid_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let result = registry.execute("echo", r#"{"other": 1}"#).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("missing field `text`"));
    }

    #[tokio::test]
    async fn tool_error_is_captured() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FailingTool));
        let result = registry.execute("flaky", "{}").await;
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("backend offline"));
    }

    #[tokio::test]
    async fn results_serialize_with_both_keys() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let failed = serde_json::to_value(registry.execute("ghost", "{}").await).unwrap();
        assert_eq!(failed, json!({"success": false, "data": null, "error": "Tool not found: ghost"}));

        let ok = serde_json::to_string(&registry.execute("echo", r#"{"text": "x"}"#).await).unwrap();
        assert_eq!(ok, r#"{"success":true,"data":{"echo":"x"},"error":null}"#);
    }

    #[test]
    fn result_without_optional_keys_still_deserializes() {
        let result: ToolResult = serde_json::from_str(r#"{"success": false, "error": "boom"}"#).unwrap();
        assert_eq!(result, ToolResult::failure("boom"));
    }

    #[tokio::test]
    async fn tool_panic_is_captured() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(PanickingTool));
        let result = registry.execute("explode", "{}").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("boom"));
    }
}
