//! MCP-style tool surface for Conductor.
//!
//! Exposes every registered agent as a tool, next to the discovery and queue
//! management tools, and speaks JSON-RPC 2.0 (`initialize`, `ping`,
//! `tools/list`, `tools/call`) independently of any transport.
//!
//! # Main types
//!
//! - [`ToolGateway`] — Resolves a tool call to an agent or a management operation.
//! - [`McpServer`] — JSON-RPC request handler in front of a [`ToolGateway`].
//! - [`CallMode`] — Whether agent tool calls wait for their task.

/// Tool resolution, agent invocation and management tools.
pub mod gateway;
/// JSON-RPC 2.0 / MCP message types.
pub mod protocol;
/// JSON-RPC method dispatch.
pub mod server;

pub use gateway::{CallMode, ManagementTool, ToolGateway, ToolMetrics, MANAGEMENT_TOOL_NAMES};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpToolDef};
pub use server::McpServer;
