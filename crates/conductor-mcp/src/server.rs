use crate::gateway::ToolGateway;
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ServerCapabilities, ServerInfo, PROTOCOL_VERSION,
};
use conductor_core::ToolCall;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Answers MCP JSON-RPC requests on behalf of a [`ToolGateway`].
///
/// Transport-agnostic: the HTTP gateway feeds it decoded bodies, tests call
/// it directly.
#[derive(Clone)]
pub struct McpServer {
    gateway: Arc<ToolGateway>,
}

impl McpServer {
    pub fn new(gateway: Arc<ToolGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<ToolGateway> {
        &self.gateway
    }

    /// Handle a raw JSON body: a single request or a batch.
    ///
    /// Returns `None` when nothing must be sent back (notifications only).
    pub async fn handle_value(&self, body: Value) -> Option<Value> {
        match body {
            Value::Array(items) => {
                if items.is_empty() {
                    return Some(error_value(JsonRpcError::invalid_request("empty batch")));
                }
                let mut responses = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(resp) = self.handle_single(item).await {
                        responses.push(resp);
                    }
                }
                (!responses.is_empty()).then_some(Value::Array(responses))
            }
            other => self.handle_single(other).await,
        }
    }

    /// Handle a body that failed to parse as JSON.
    pub fn parse_failure(detail: impl std::fmt::Display) -> Value {
        error_value(JsonRpcError::parse_error(detail))
    }

    async fn handle_single(&self, item: Value) -> Option<Value> {
        let request: JsonRpcRequest = match serde_json::from_value(item) {
            Ok(req) => req,
            Err(e) => return Some(error_value(JsonRpcError::invalid_request(e))),
        };
        let response = self.handle(request).await?;
        match serde_json::to_value(response) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Failed to encode JSON-RPC response");
                None
            }
        }
    }

    /// Handle one decoded request. Notifications yield `None`.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "MCP request");

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                request.id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            ));
        }

        let Some(id) = request.id else {
            if request.method != "notifications/initialized" {
                debug!(method = %request.method, "Ignoring notification");
            }
            return None;
        };

        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({"tools": self.gateway.list_tools()})),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self) -> Result<Value, JsonRpcError> {
        let description = self.gateway.description();
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(json!({"listChanged": false})),
            },
            server_info: ServerInfo {
                name: self.gateway.name().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: (!description.is_empty()).then(|| description.to_string()),
        };
        serde_json::to_value(result).map_err(JsonRpcError::internal)
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("missing params"))
            .and_then(|p| serde_json::from_value(p).map_err(JsonRpcError::invalid_params))?;

        let call = ToolCall::new(params.name, params.arguments.unwrap_or_else(|| json!({})));
        let result = CallToolResult::from(self.gateway.call(call).await);
        serde_json::to_value(result).map_err(JsonRpcError::internal)
    }
}

fn error_value(error: JsonRpcError) -> Value {
    json!({"jsonrpc": "2.0", "id": null, "error": error})
}
