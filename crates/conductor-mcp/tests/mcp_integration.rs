#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the conductor-mcp crate.
//!
//! Covers: agent tools in sync and async mode, discovery and search tools,
//! queue management tools, task status lookup, and JSON-RPC dispatch.

use async_trait::async_trait;
use conductor_core::{AgentCapability, ConductorError, ConductorResult, TaskPayload, ToolCall};
use conductor_mcp::{CallMode, JsonRpcRequest, McpServer, ToolGateway, MANAGEMENT_TOOL_NAMES};
use conductor_orchestrator::{AgentDescriptor, AgentRegistry, Dispatcher};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Echo;

#[async_trait]
impl AgentCapability for Echo {
    async fn invoke(&self, payload: &TaskPayload) -> ConductorResult<String> {
        Ok(format!("echo: {}", payload.task))
    }
}

struct Failing;

#[async_trait]
impl AgentCapability for Failing {
    async fn invoke(&self, _payload: &TaskPayload) -> ConductorResult<String> {
        Err(ConductorError::InvocationFailure("model unavailable".into()))
    }
}

struct Harness {
    gateway: Arc<ToolGateway>,
    dispatcher: Dispatcher,
}

impl Harness {
    async fn call(&self, name: &str, arguments: Value) -> conductor_core::ToolResult {
        self.gateway.call(ToolCall::new(name, arguments)).await
    }
}

fn registry() -> Arc<AgentRegistry> {
    let registry = AgentRegistry::new().with_reserved_names(MANAGEMENT_TOOL_NAMES);
    let agents: Vec<(AgentDescriptor, Arc<dyn AgentCapability>)> = vec![
        (
            AgentDescriptor::new(
                "Blood-Data-Analysis-Agent",
                "Interprets blood test results for patients",
            )
            .with_tags(["lab", "hematology", "metabolic", "education"])
            .with_capabilities(["blood-analysis", "patient-education"]),
            Arc::new(Echo),
        ),
        (
            AgentDescriptor::new("Chest-Xray-Agent", "Reads chest radiographs")
                .with_tags(["imaging", "radiology"])
                .with_capabilities(["image-analysis"]),
            Arc::new(Echo),
        ),
        (
            AgentDescriptor::new("Echo", "Repeats the task").with_tags(["utility"]),
            Arc::new(Echo),
        ),
        (
            AgentDescriptor::new("Flaky", "Always fails"),
            Arc::new(Failing),
        ),
    ];
    for outcome in registry.register_batch(agents) {
        outcome.result.unwrap();
    }
    Arc::new(registry)
}

fn harness(mode: CallMode) -> Harness {
    let registry = registry();
    let dispatcher = Dispatcher::new(registry.clone());
    dispatcher.start();
    let gateway = Arc::new(
        ToolGateway::new(registry)
            .with_call_mode(mode)
            .with_identity("medical-aop", "Medical multi-agent server"),
    );
    Harness {
        gateway,
        dispatcher,
    }
}

// ---------------------------------------------------------------------------
// Agent tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sync_agent_call_returns_result() {
    let h = harness(CallMode::Sync);
    let result = h.call("Echo", json!({"task": "hello"})).await;
    assert!(!result.is_error);
    assert_eq!(result.output["status"], "completed");
    assert_eq!(result.output["result"], "echo: hello");
    assert!(result.output["task_id"].as_u64().unwrap() >= 1);
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_sync_agent_failure_is_error_result() {
    let h = harness(CallMode::Sync);
    let result = h.call("Flaky", json!({"task": "x"})).await;
    assert!(result.is_error);
    assert_eq!(result.error_kind(), Some("invocation_failure"));
    assert!(result.output["message"]
        .as_str()
        .unwrap()
        .contains("model unavailable"));
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_async_mode_returns_task_id_then_status() {
    let h = harness(CallMode::Async);
    let result = h.call("Echo", json!({"task": "later"})).await;
    assert!(!result.is_error);
    assert_eq!(result.output["status"], "queued");
    let task_id = result.output["task_id"].as_u64().unwrap();

    h.gateway
        .registry()
        .task_book()
        .wait(task_id)
        .await
        .unwrap();
    let status = h.call("get_task_status", json!({"task_id": task_id})).await;
    assert!(!status.is_error);
    assert_eq!(status.output["status"], "completed");
    assert_eq!(status.output["result"], "echo: later");
    assert_eq!(status.output["agent_name"], "Echo");
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_wait_argument_overrides_call_mode() {
    let h = harness(CallMode::Async);
    let result = h.call("Echo", json!({"task": "now", "wait": true})).await;
    assert_eq!(result.output["result"], "echo: now");

    let h2 = harness(CallMode::Sync);
    let result = h2.call("Echo", json!({"task": "later", "wait": false})).await;
    assert_eq!(result.output["status"], "queued");
    h.dispatcher.shutdown().await;
    h2.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_agent_call_without_task_is_invalid_arguments() {
    let h = harness(CallMode::Sync);
    let result = h.call("Echo", json!({"img": "scan.png"})).await;
    assert!(result.is_error);
    assert_eq!(result.error_kind(), Some("invalid_arguments"));
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_unknown_tool() {
    let h = harness(CallMode::Sync);
    let result = h.call("Dermatology-Agent", json!({"task": "x"})).await;
    assert!(result.is_error);
    assert_eq!(result.error_kind(), Some("unknown_tool"));
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_pause_enqueue_resume_through_tools() {
    let h = harness(CallMode::Async);
    let paused = h.call("pause_agent_queue", json!({"agent_name": "Echo"})).await;
    assert_eq!(paused.output["paused"], true);

    let queued = h.call("Echo", json!({"task": "held"})).await;
    let task_id = queued.output["task_id"].as_u64().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = h.call("get_task_status", json!({"task_id": task_id})).await;
    assert_eq!(status.output["status"], "queued");
    let stats = h.call("get_queue_stats", json!({"agent_name": "Echo"})).await;
    assert_eq!(stats.output["pending_count"], 1);
    assert_eq!(stats.output["paused"], true);

    h.call("resume_agent_queue", json!({"agent_name": "Echo"})).await;
    h.gateway
        .registry()
        .task_book()
        .wait(task_id)
        .await
        .unwrap();
    let status = h.call("get_task_status", json!({"task_id": task_id.to_string()})).await;
    assert_eq!(status.output["status"], "completed");
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_clear_queue_cancels_pending() {
    let h = harness(CallMode::Async);
    h.call("pause_agent_queue", json!({"agent_name": "Echo"})).await;
    let mut ids = Vec::new();
    for i in 0..3 {
        let r = h.call("Echo", json!({"task": format!("t{i}")})).await;
        ids.push(r.output["task_id"].as_u64().unwrap());
    }

    let cleared = h.call("clear_agent_queue", json!({"agent_name": "Echo"})).await;
    assert_eq!(cleared.output["cleared"], 3);
    for id in ids {
        let status = h.call("get_task_status", json!({"task_id": id})).await;
        assert_eq!(status.output["status"], "cancelled");
    }
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_sync_call_cleared_while_queued_is_cancelled() {
    let h = harness(CallMode::Sync);
    h.call("pause_agent_queue", json!({"agent_name": "Echo"})).await;

    let gateway = h.gateway.clone();
    let waiter = tokio::spawn(async move {
        gateway
            .call(ToolCall::new("Echo", json!({"task": "doomed"})))
            .await
    });
    while h.gateway.registry().queue("Echo").unwrap().stats().pending_count == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    h.call("clear_agent_queue", json!({"agent_name": "Echo"})).await;

    let result = waiter.await.unwrap();
    assert!(result.is_error);
    assert_eq!(result.error_kind(), Some("task_cancelled"));
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_echo_stats_after_three_calls() {
    let h = harness(CallMode::Sync);
    for t in ["a", "b", "c"] {
        assert!(!h.call("Echo", json!({"task": t})).await.is_error);
    }
    let stats = h.call("get_queue_stats", json!({"agent_name": "Echo"})).await;
    assert_eq!(stats.output["total_processed"], 3);
    assert_eq!(stats.output["total_failed"], 0);
    assert_eq!(stats.output["pending_count"], 0);
    h.dispatcher.shutdown().await;
}

// ---------------------------------------------------------------------------
// Discovery tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_discover_agents_metadata_only() {
    let h = harness(CallMode::Sync);
    let result = h.call("discover_agents", json!({})).await;
    let agents = result.output["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 4);
    assert_eq!(agents[0]["name"], "Blood-Data-Analysis-Agent");
    assert!(agents[0].get("max_concurrency").is_none());
    assert_eq!(agents[0]["role"], "worker");
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_search_by_tag() {
    let h = harness(CallMode::Sync);
    let result = h
        .call("search_agents", json!({"query": "lab", "search_fields": ["tags"]}))
        .await;
    let matches = result.output["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["name"], "Blood-Data-Analysis-Agent");
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_search_invalid_field() {
    let h = harness(CallMode::Sync);
    let result = h
        .call("search_agents", json!({"query": "lab", "search_fields": ["owner"]}))
        .await;
    assert_eq!(result.error_kind(), Some("invalid_field"));
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_agent_details_and_unknown_agent() {
    let h = harness(CallMode::Sync);
    let details = h
        .call("get_agent_details", json!({"agent_name": "Chest-Xray-Agent"}))
        .await;
    assert_eq!(details.output["agent"]["tags"], json!(["imaging", "radiology"]));
    assert_eq!(details.output["queue"]["max_concurrency"], 1);

    let missing = h.call("get_agent_details", json!({"agent_name": "Ghost"})).await;
    assert_eq!(missing.error_kind(), Some("unknown_agent"));
    let pause = h.call("pause_agent_queue", json!({"agent_name": "Ghost"})).await;
    assert_eq!(pause.error_kind(), Some("unknown_agent"));
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_agents_info_reports_missing_names() {
    let h = harness(CallMode::Sync);
    let result = h
        .call("get_agents_info", json!({"agent_names": ["Echo", "Ghost"]}))
        .await;
    assert!(!result.is_error);
    assert_eq!(result.output["agents"].as_array().unwrap().len(), 1);
    assert_eq!(result.output["not_found"], json!(["Ghost"]));

    let all = h.call("get_agents_info", json!({})).await;
    assert_eq!(all.output["agents"].as_array().unwrap().len(), 4);
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_list_agents_and_server_info() {
    let h = harness(CallMode::Sync);
    let list = h.call("list_agents", json!({})).await;
    assert_eq!(
        list.output["agents"],
        json!(["Blood-Data-Analysis-Agent", "Chest-Xray-Agent", "Echo", "Flaky"])
    );

    let info = h.call("get_server_info", Value::Null).await;
    assert_eq!(info.output["name"], "medical-aop");
    assert_eq!(info.output["agent_count"], 4);
    assert_eq!(info.output["call_mode"], "sync");
    assert_eq!(info.output["tools"].as_array().unwrap().len(), 4 + MANAGEMENT_TOOL_NAMES.len());
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_task_status_unknown_id() {
    let h = harness(CallMode::Sync);
    let result = h.call("get_task_status", json!({"task_id": 424242})).await;
    assert_eq!(result.error_kind(), Some("task_not_found"));
    let bad = h.call("get_task_status", json!({"task_id": "abc"})).await;
    assert_eq!(bad.error_kind(), Some("invalid_arguments"));
    h.dispatcher.shutdown().await;
}

#[test]
fn test_agent_cannot_take_management_name() {
    let registry = AgentRegistry::new().with_reserved_names(MANAGEMENT_TOOL_NAMES);
    let err = registry
        .register(AgentDescriptor::new("list_agents", ""), Arc::new(Echo))
        .unwrap_err();
    assert_eq!(err.kind(), "duplicate_agent");
}

#[tokio::test]
async fn test_tool_metrics_are_recorded() {
    let h = harness(CallMode::Sync);
    h.call("Echo", json!({"task": "a"})).await;
    h.call("Echo", json!({})).await;
    let metrics = h.gateway.metrics();
    let echo = metrics.get("Echo").unwrap();
    assert_eq!(echo.total_calls, 2);
    assert_eq!(echo.successful_calls, 1);
    assert_eq!(echo.failed_calls, 1);
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_unknown_tool_names_are_not_tracked() {
    let h = harness(CallMode::Sync);
    h.call("list_agents", json!({})).await;
    for i in 0..50 {
        let result = h.call(&format!("bogus-{i}"), json!({})).await;
        assert_eq!(result.error_kind(), Some("unknown_tool"));
    }
    let metrics = h.gateway.metrics();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics["list_agents"].total_calls, 1);
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_releases_blocked_sync_call() {
    let registry = registry();
    let dispatcher = Dispatcher::new(registry.clone());
    dispatcher.start();
    let gateway = Arc::new(
        ToolGateway::new(registry.clone()).with_shutdown(dispatcher.shutdown_listener()),
    );
    gateway
        .call(ToolCall::new("pause_agent_queue", json!({"agent_name": "Echo"})))
        .await;

    let waiter = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            gateway
                .call(ToolCall::new("Echo", json!({"task": "never runs"})))
                .await
        })
    };
    while registry.queue("Echo").unwrap().stats().pending_count == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    dispatcher.shutdown().await;
    let result = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("sync call still blocked after shutdown")
        .unwrap();
    assert!(result.is_error);
    assert_eq!(result.error_kind(), Some("shutting_down"));

    let pending = registry.queue("Echo").unwrap().pending_ids();
    assert_eq!(pending.len(), 1);
    let status = registry.task(pending[0]).unwrap().status;
    assert_eq!(status, conductor_orchestrator::TaskStatus::Queued);
}

// ---------------------------------------------------------------------------
// JSON-RPC dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_jsonrpc_initialize_and_list() {
    let h = harness(CallMode::Sync);
    let server = McpServer::new(h.gateway.clone());

    let init = server
        .handle(JsonRpcRequest::new(1, "initialize", Some(json!({}))))
        .await
        .unwrap();
    let result = init.result.unwrap();
    assert_eq!(result["serverInfo"]["name"], "medical-aop");
    assert!(result["capabilities"]["tools"].is_object());

    let list = server
        .handle(JsonRpcRequest::new(2, "tools/list", None))
        .await
        .unwrap();
    let tools = list.result.unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools[0]["name"], "Blood-Data-Analysis-Agent");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["task"]));
    assert_eq!(tools[4]["name"], "discover_agents");
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_jsonrpc_tools_call() {
    let h = harness(CallMode::Sync);
    let server = McpServer::new(h.gateway.clone());
    let resp = server
        .handle(JsonRpcRequest::new(
            "req-1",
            "tools/call",
            Some(json!({"name": "Echo", "arguments": {"task": "over rpc"}})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.id, json!("req-1"));
    let result = resp.result.unwrap();
    assert_eq!(result["isError"], false);
    assert_eq!(result["structuredContent"]["result"], "echo: over rpc");
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_jsonrpc_errors() {
    let h = harness(CallMode::Sync);
    let server = McpServer::new(h.gateway.clone());

    let unknown = server
        .handle(JsonRpcRequest::new(1, "resources/list", None))
        .await
        .unwrap();
    assert_eq!(unknown.error.unwrap().code, -32601);

    let missing = server
        .handle(JsonRpcRequest::new(2, "tools/call", None))
        .await
        .unwrap();
    assert_eq!(missing.error.unwrap().code, -32602);

    let invalid = server.handle_value(json!({"jsonrpc": "2.0", "id": 3})).await.unwrap();
    assert_eq!(invalid["error"]["code"], -32600);

    let notification = server
        .handle_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    assert!(notification.is_none());
    h.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_jsonrpc_batch() {
    let h = harness(CallMode::Sync);
    let server = McpServer::new(h.gateway.clone());
    let resp = server
        .handle_value(json!([
            {"jsonrpc": "2.0", "id": 1, "method": "ping"},
            {"jsonrpc": "2.0", "method": "notifications/initialized"},
            {"jsonrpc": "2.0", "id": 2, "method": "tools/list"},
        ]))
        .await
        .unwrap();
    assert_eq!(resp.as_array().unwrap().len(), 2);
    h.dispatcher.shutdown().await;
}
