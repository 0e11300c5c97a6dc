use crate::ConductorError;
use serde::{Deserialize, Serialize};

/// A request from a client to invoke a named tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke (an agent name or a management tool).
    pub name: String,
    /// JSON arguments to pass to the tool.
    #[serde(default = "empty_arguments")]
    pub arguments: serde_json::Value,
}

fn empty_arguments() -> serde_json::Value {
    serde_json::json!({})
}

impl ToolCall {
    /// Creates a tool call with the given name and arguments.
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The structured outcome of executing a [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Structured output; a `{kind, message}` object when `is_error` is set.
    pub output: serde_json::Value,
    /// Whether the tool execution ended in an error.
    pub is_error: bool,
}

impl ToolResult {
    /// Creates a successful tool result.
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            output,
            is_error: false,
        }
    }

    /// Creates an error tool result from a [`ConductorError`].
    pub fn error(err: &ConductorError) -> Self {
        Self {
            output: err.to_json(),
            is_error: true,
        }
    }

    /// The `kind` of an error result, if this is one.
    pub fn error_kind(&self) -> Option<&str> {
        if !self.is_error {
            return None;
        }
        self.output.get("kind").and_then(|k| k.as_str())
    }
}

impl From<crate::ConductorResult<serde_json::Value>> for ToolResult {
    fn from(result: crate::ConductorResult<serde_json::Value>) -> Self {
        match result {
            Ok(output) => ToolResult::success(output),
            Err(e) => ToolResult::error(&e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success(serde_json::json!({"ok": true}));
        assert!(!result.is_error);
        assert!(result.error_kind().is_none());
    }

    #[test]
    fn test_tool_result_error() {
        let result = ToolResult::error(&ConductorError::UnknownTool("nope".into()));
        assert!(result.is_error);
        assert_eq!(result.error_kind(), Some("unknown_tool"));
    }

    #[test]
    fn test_tool_call_defaults_arguments() {
        let call: ToolCall = serde_json::from_str(r#"{"name": "list_agents"}"#).unwrap();
        assert_eq!(call.name, "list_agents");
        assert_eq!(call.arguments, serde_json::json!({}));
    }
}
