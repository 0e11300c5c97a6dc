//! HTTP transport for Conductor.
//!
//! Serves the MCP JSON-RPC endpoint (`POST /mcp`) and a health check
//! (`GET /health`) with axum, with optional static API-key auth and
//! per-request correlation ids.

/// Auth and request-id middleware.
pub mod middleware;
/// Router construction and handlers.
pub mod server;

pub use middleware::AuthConfig;
pub use server::{AppState, GatewayServer};
