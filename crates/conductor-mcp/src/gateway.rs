use crate::protocol::McpToolDef;
use conductor_core::{ConductorError, ConductorResult, TaskPayload, ToolCall, ToolResult};
use conductor_orchestrator::{AgentEntry, AgentRegistry, TaskId, TaskRecord, TaskStatus};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, warn};

/// Whether an agent tool call waits for its task to finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// Wait for the task and return its result or failure.
    #[default]
    Sync,
    /// Return the task id immediately; clients poll `get_task_status`.
    Async,
}

impl std::fmt::Display for CallMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallMode::Sync => write!(f, "sync"),
            CallMode::Async => write!(f, "async"),
        }
    }
}

/// Built-in tools that operate on the registry rather than on one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagementTool {
    DiscoverAgents,
    GetAgentDetails,
    GetAgentsInfo,
    ListAgents,
    SearchAgents,
    GetQueueStats,
    PauseAgentQueue,
    ResumeAgentQueue,
    ClearAgentQueue,
    GetTaskStatus,
    GetServerInfo,
}

/// Names of every management tool, in listing order. Agents may not use them.
pub const MANAGEMENT_TOOL_NAMES: [&str; 11] = [
    "discover_agents",
    "get_agent_details",
    "get_agents_info",
    "list_agents",
    "search_agents",
    "get_queue_stats",
    "pause_agent_queue",
    "resume_agent_queue",
    "clear_agent_queue",
    "get_task_status",
    "get_server_info",
];

impl ManagementTool {
    pub const ALL: [ManagementTool; 11] = [
        ManagementTool::DiscoverAgents,
        ManagementTool::GetAgentDetails,
        ManagementTool::GetAgentsInfo,
        ManagementTool::ListAgents,
        ManagementTool::SearchAgents,
        ManagementTool::GetQueueStats,
        ManagementTool::PauseAgentQueue,
        ManagementTool::ResumeAgentQueue,
        ManagementTool::ClearAgentQueue,
        ManagementTool::GetTaskStatus,
        ManagementTool::GetServerInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ManagementTool::DiscoverAgents => "discover_agents",
            ManagementTool::GetAgentDetails => "get_agent_details",
            ManagementTool::GetAgentsInfo => "get_agents_info",
            ManagementTool::ListAgents => "list_agents",
            ManagementTool::SearchAgents => "search_agents",
            ManagementTool::GetQueueStats => "get_queue_stats",
            ManagementTool::PauseAgentQueue => "pause_agent_queue",
            ManagementTool::ResumeAgentQueue => "resume_agent_queue",
            ManagementTool::ClearAgentQueue => "clear_agent_queue",
            ManagementTool::GetTaskStatus => "get_task_status",
            ManagementTool::GetServerInfo => "get_server_info",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            ManagementTool::DiscoverAgents => {
                "Discover all agents with their description, tags, capabilities and role"
            }
            ManagementTool::GetAgentDetails => {
                "Get the full configuration and queue statistics of one agent"
            }
            ManagementTool::GetAgentsInfo => {
                "Get configuration for several agents, or all agents when no names are given"
            }
            ManagementTool::ListAgents => "List the names of all registered agents",
            ManagementTool::SearchAgents => {
                "Search agents by a case-insensitive substring over name, description, tags and capabilities"
            }
            ManagementTool::GetQueueStats => {
                "Get queue statistics for one agent, or for all agents when no name is given"
            }
            ManagementTool::PauseAgentQueue => {
                "Pause an agent's queue; running tasks finish, pending tasks wait"
            }
            ManagementTool::ResumeAgentQueue => "Resume a paused agent queue",
            ManagementTool::ClearAgentQueue => {
                "Cancel every pending task of an agent; running tasks are not affected"
            }
            ManagementTool::GetTaskStatus => "Get the status and result of a submitted task",
            ManagementTool::GetServerInfo => "Get server name, description, agents and tools",
        }
    }

    pub fn input_schema(self) -> Value {
        let agent_name = json!({"type": "string", "description": "Registered agent name"});
        match self {
            ManagementTool::DiscoverAgents
            | ManagementTool::ListAgents
            | ManagementTool::GetServerInfo => json!({"type": "object", "properties": {}}),
            ManagementTool::GetAgentDetails
            | ManagementTool::PauseAgentQueue
            | ManagementTool::ResumeAgentQueue
            | ManagementTool::ClearAgentQueue => json!({
                "type": "object",
                "properties": {"agent_name": agent_name},
                "required": ["agent_name"],
            }),
            ManagementTool::GetAgentsInfo => json!({
                "type": "object",
                "properties": {
                    "agent_names": {"type": "array", "items": {"type": "string"}},
                },
            }),
            ManagementTool::SearchAgents => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "search_fields": {
                        "type": "array",
                        "items": {
                            "type": "string",
                            "enum": ["name", "description", "tags", "capabilities"],
                        },
                    },
                },
                "required": ["query"],
            }),
            ManagementTool::GetQueueStats => json!({
                "type": "object",
                "properties": {"agent_name": agent_name},
            }),
            ManagementTool::GetTaskStatus => json!({
                "type": "object",
                "properties": {"task_id": {"type": "integer", "minimum": 1}},
                "required": ["task_id"],
            }),
        }
    }
}

/// Input schema shared by every agent tool.
pub fn agent_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "task": {"type": "string", "description": "Task for the agent"},
            "img": {"type": "string", "description": "Single image path or URI"},
            "imgs": {"type": "array", "items": {"type": "string"}},
            "correctAnswer": {"type": "string", "description": "Expected answer, for evaluation"},
            "wait": {"type": "boolean", "description": "Wait for the result instead of returning a task id"},
        },
        "required": ["task"],
    })
}

/// What a tool name resolves to.
enum ToolTarget {
    Agent(Arc<AgentEntry>),
    Management(ManagementTool),
}

/// Per-tool call counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetrics {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub total_duration_ms: u64,
}

#[derive(Deserialize)]
struct AgentNameArgs {
    agent_name: String,
}

#[derive(Deserialize)]
struct OptionalAgentNameArgs {
    #[serde(default)]
    agent_name: Option<String>,
}

#[derive(Deserialize)]
struct AgentNamesArgs {
    #[serde(default)]
    agent_names: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    search_fields: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TaskIdArg {
    Number(TaskId),
    Text(String),
}

#[derive(Deserialize)]
struct TaskStatusArgs {
    task_id: TaskIdArg,
}

#[derive(Deserialize)]
struct AgentCallArgs {
    #[serde(flatten)]
    payload: TaskPayload,
    #[serde(default)]
    wait: Option<bool>,
}

fn parse_args<T: DeserializeOwned>(arguments: &Value) -> ConductorResult<T> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments.clone()
    };
    serde_json::from_value(arguments).map_err(|e| ConductorError::InvalidArguments(e.to_string()))
}

/// Maps tool calls onto registry, queue and task-book operations.
///
/// The only component clients talk to. Agent names and management tool
/// names share one namespace; every call resolves to either one agent or one
/// management tool before anything runs.
pub struct ToolGateway {
    registry: Arc<AgentRegistry>,
    call_mode: CallMode,
    name: String,
    description: String,
    metrics: RwLock<HashMap<String, ToolMetrics>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ToolGateway {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            call_mode: CallMode::Sync,
            name: "conductor".to_string(),
            description: String::new(),
            metrics: RwLock::new(HashMap::new()),
            shutdown: None,
        }
    }

    /// Release synchronous callers with `ShuttingDown` once `shutdown` turns
    /// true, instead of waiting on tasks that will never run.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_call_mode(mut self, call_mode: CallMode) -> Self {
        self.call_mode = call_mode;
        self
    }

    pub fn with_identity(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.name = name.into();
        self.description = description.into();
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn call_mode(&self) -> CallMode {
        self.call_mode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Agent tools in registration order, then the management tools.
    pub fn list_tools(&self) -> Vec<McpToolDef> {
        let agents = self.registry.list().into_iter().map(|d| McpToolDef {
            name: d.name,
            description: d.description,
            input_schema: agent_input_schema(),
        });
        let management = ManagementTool::ALL.into_iter().map(|t| McpToolDef {
            name: t.name().to_string(),
            description: t.description().to_string(),
            input_schema: t.input_schema(),
        });
        agents.chain(management).collect()
    }

    /// Snapshot of per-tool call counters.
    pub fn metrics(&self) -> HashMap<String, ToolMetrics> {
        self.metrics.read().clone()
    }

    /// Execute one tool call. Failures come back as error results, never panics.
    pub async fn call(&self, call: ToolCall) -> ToolResult {
        let start = Instant::now();
        info!(tool = %call.name, "ToolGateway: executing tool call");

        let target = match self.resolve(&call.name) {
            Ok(target) => target,
            Err(e) => {
                warn!(tool = %call.name, "ToolGateway: unknown tool");
                return ToolResult::error(&e);
            }
        };
        let result = match target {
            ToolTarget::Agent(entry) => self.call_agent(&entry, &call.arguments).await,
            ToolTarget::Management(tool) => {
                ToolResult::from(self.call_management(tool, &call.arguments))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        self.record(&call.name, !result.is_error, duration_ms);
        if result.is_error {
            warn!(
                tool = %call.name,
                duration_ms,
                kind = result.error_kind().unwrap_or("unknown"),
                "ToolGateway: tool call failed"
            );
        } else {
            info!(tool = %call.name, duration_ms, "ToolGateway: tool call complete");
        }
        result
    }

    fn resolve(&self, name: &str) -> ConductorResult<ToolTarget> {
        if let Some(tool) = ManagementTool::from_name(name) {
            return Ok(ToolTarget::Management(tool));
        }
        self.registry
            .entry(name)
            .map(ToolTarget::Agent)
            .map_err(|_| ConductorError::UnknownTool(name.to_string()))
    }

    fn record(&self, tool: &str, success: bool, duration_ms: u64) {
        let mut metrics = self.metrics.write();
        let m = metrics.entry(tool.to_string()).or_default();
        m.total_calls += 1;
        m.total_duration_ms += duration_ms;
        if success {
            m.successful_calls += 1;
        } else {
            m.failed_calls += 1;
        }
    }

    async fn call_agent(&self, entry: &AgentEntry, arguments: &Value) -> ToolResult {
        let args: AgentCallArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(e) => return ToolResult::error(&e),
        };
        let agent = entry.descriptor.name.clone();
        let task_id = match entry.queue.enqueue(args.payload) {
            Ok(id) => id,
            Err(e) => return ToolResult::error(&e),
        };

        let wait = args.wait.unwrap_or(self.call_mode == CallMode::Sync);
        if !wait {
            return ToolResult::success(json!({
                "task_id": task_id,
                "agent_name": agent,
                "status": TaskStatus::Queued,
            }));
        }

        let record = match self.wait_for_task(task_id).await {
            Ok(record) => record,
            Err(e) => return ToolResult::error(&e),
        };
        match record.status {
            TaskStatus::Completed => ToolResult::success(json!({
                "task_id": task_id,
                "agent_name": agent,
                "status": record.status,
                "result": record.result,
                "duration_ms": record.duration_ms(),
            })),
            TaskStatus::Cancelled => ToolResult::error(&ConductorError::TaskCancelled(task_id)),
            _ => ToolResult {
                output: json!({
                    "kind": "invocation_failure",
                    "message": record.error.unwrap_or_default(),
                    "task_id": task_id,
                }),
                is_error: true,
            },
        }
    }

    async fn wait_for_task(&self, task_id: TaskId) -> ConductorResult<TaskRecord> {
        let finished = self.registry.task_book().wait(task_id);
        let Some(shutdown) = &self.shutdown else {
            return finished.await;
        };
        let mut shutdown = shutdown.clone();
        tokio::select! {
            biased;
            record = finished => record,
            _ = shutdown.wait_for(|stop| *stop) => {
                warn!(task_id, "Releasing synchronous caller: shutting down");
                Err(ConductorError::ShuttingDown(task_id))
            }
        }
    }

    fn call_management(&self, tool: ManagementTool, arguments: &Value) -> ConductorResult<Value> {
        match tool {
            ManagementTool::DiscoverAgents => {
                let agents = self.registry.discover();
                Ok(json!({"total": agents.len(), "agents": agents}))
            }
            ManagementTool::GetAgentDetails => {
                let args: AgentNameArgs = parse_args(arguments)?;
                let entry = self.registry.entry(&args.agent_name)?;
                Ok(json!({
                    "agent": entry.descriptor,
                    "timeout_ms": entry.descriptor.timeout.map(|t| t.as_millis() as u64),
                    "queue": entry.queue.stats(),
                }))
            }
            ManagementTool::GetAgentsInfo => {
                let args: AgentNamesArgs = parse_args(arguments)?;
                match args.agent_names {
                    Some(names) => {
                        let mut agents = Vec::new();
                        let mut not_found = Vec::new();
                        for name in names {
                            match self.registry.get(&name) {
                                Ok(desc) => agents.push(desc),
                                Err(_) => not_found.push(name),
                            }
                        }
                        Ok(json!({"agents": agents, "not_found": not_found}))
                    }
                    None => Ok(json!({"agents": self.registry.list(), "not_found": []})),
                }
            }
            ManagementTool::ListAgents => {
                let names = self.registry.names();
                Ok(json!({"total": names.len(), "agents": names}))
            }
            ManagementTool::SearchAgents => {
                let args: SearchArgs = parse_args(arguments)?;
                let matches = self
                    .registry
                    .search(&args.query, args.search_fields.as_deref())?;
                Ok(json!({"query": args.query, "total": matches.len(), "matches": matches}))
            }
            ManagementTool::GetQueueStats => {
                let args: OptionalAgentNameArgs = parse_args(arguments)?;
                match args.agent_name {
                    Some(name) => Ok(serde_json::to_value(self.registry.queue(&name)?.stats())?),
                    None => {
                        let queues: Vec<_> = self
                            .registry
                            .entries()
                            .iter()
                            .map(|e| e.queue.stats())
                            .collect();
                        Ok(json!({"queues": queues}))
                    }
                }
            }
            ManagementTool::PauseAgentQueue => {
                let args: AgentNameArgs = parse_args(arguments)?;
                self.registry.queue(&args.agent_name)?.pause();
                Ok(json!({"agent_name": args.agent_name, "paused": true}))
            }
            ManagementTool::ResumeAgentQueue => {
                let args: AgentNameArgs = parse_args(arguments)?;
                self.registry.queue(&args.agent_name)?.resume();
                Ok(json!({"agent_name": args.agent_name, "paused": false}))
            }
            ManagementTool::ClearAgentQueue => {
                let args: AgentNameArgs = parse_args(arguments)?;
                let cleared = self.registry.queue(&args.agent_name)?.clear();
                Ok(json!({"agent_name": args.agent_name, "cleared": cleared}))
            }
            ManagementTool::GetTaskStatus => {
                let args: TaskStatusArgs = parse_args(arguments)?;
                let id = match args.task_id {
                    TaskIdArg::Number(id) => id,
                    TaskIdArg::Text(text) => text.trim().parse().map_err(|_| {
                        ConductorError::InvalidArguments(format!("task_id '{text}' is not a number"))
                    })?,
                };
                let record = self.registry.task(id)?;
                let mut out = serde_json::to_value(&record)?;
                out["duration_ms"] = json!(record.duration_ms());
                Ok(out)
            }
            ManagementTool::GetServerInfo => Ok(self.server_info()),
        }
    }

    /// Server metadata returned by `get_server_info`.
    pub fn server_info(&self) -> Value {
        let tools: Vec<String> = self.list_tools().into_iter().map(|t| t.name).collect();
        json!({
            "name": self.name,
            "description": self.description,
            "version": env!("CARGO_PKG_VERSION"),
            "call_mode": self.call_mode,
            "agent_count": self.registry.len(),
            "agents": self.registry.names(),
            "management_tools": MANAGEMENT_TOOL_NAMES,
            "tools": tools,
        })
    }
}
