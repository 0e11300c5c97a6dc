use crate::middleware::{auth_middleware, request_id_middleware, AuthConfig, MiddlewareState};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware as axum_mw,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use conductor_mcp::McpServer;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{debug, info};
use uuid::Uuid;

/// Header assigning an MCP session on `initialize`.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Shared application state.
pub struct AppState {
    pub mcp: McpServer,
}

/// The HTTP front of a Conductor server.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the gateway without auth.
    pub fn build(mcp: McpServer) -> Router {
        Self::build_with_auth(mcp, AuthConfig::default())
    }

    /// Build the gateway; `/mcp` requires an API key when `auth` has any.
    /// `/health` stays open.
    pub fn build_with_auth(mcp: McpServer, auth: AuthConfig) -> Router {
        let state = Arc::new(AppState { mcp });

        let mut api = Router::new()
            .route("/mcp", post(mcp_handler))
            .with_state(state);
        if auth.is_enabled() {
            let mw_state = Arc::new(MiddlewareState { auth });
            api = api.layer(axum_mw::from_fn_with_state(mw_state, auth_middleware));
        }

        Router::new()
            .route("/health", get(health_handler))
            .merge(api)
            .layer(ServiceBuilder::new().layer(axum_mw::from_fn(request_id_middleware)))
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "conductor"}))
}

/// `POST /mcp`: one JSON-RPC request, notification, or batch per body.
///
/// Parse failures answer 400 with a JSON-RPC parse error; bodies that
/// contain only notifications answer 202 with no content.
async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Rejected unparsable JSON-RPC body");
            return (StatusCode::BAD_REQUEST, Json(McpServer::parse_failure(e))).into_response();
        }
    };

    let initializing = value.get("method").and_then(Value::as_str) == Some("initialize");
    let Some(reply) = state.mcp.handle_value(value).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    let mut response = Json(reply).into_response();
    if initializing {
        let session = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info!(session_id = %session, "MCP session initialized");
        if let Ok(value) = HeaderValue::from_str(&session) {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }
    response
}
