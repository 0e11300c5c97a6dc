use chrono::{DateTime, Utc};
use conductor_core::{ConductorError, ConductorResult, TaskPayload};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Process-unique, monotonically assigned task identifier.
pub type TaskId = u64;

/// Role of an agent in the deployment. Informational only: the orchestrator
/// schedules every role the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Executes tasks handed to it.
    #[default]
    Worker,
    /// Delegates to and supervises other agents.
    Manager,
    /// Combines the outputs of several agents.
    Coordinator,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Worker => write!(f, "worker"),
            AgentRole::Manager => write!(f, "manager"),
            AgentRole::Coordinator => write!(f, "coordinator"),
        }
    }
}

fn default_max_concurrency() -> usize {
    1
}

/// Static identity and routing metadata for one registered agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique name; doubles as the agent's tool name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Discovery tags, deduplicated.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Informational capability labels, deduplicated.
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub role: AgentRole,
    /// Max simultaneous in-flight invocations.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Bound on not-yet-started tasks; `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_queue_size: Option<usize>,
    /// Per-invocation timeout enforced by the dispatcher.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl AgentDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            capabilities: Vec::new(),
            role: AgentRole::Worker,
            max_concurrency: default_max_concurrency(),
            max_queue_size: None,
            timeout: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = dedup(tags);
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = dedup(capabilities);
        self
    }

    pub fn with_role(mut self, role: AgentRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = Some(max_queue_size);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reject descriptors the registry cannot schedule.
    pub fn validate(&self) -> ConductorResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConductorError::Config("agent name must not be empty".into()));
        }
        if self.max_concurrency == 0 {
            return Err(ConductorError::Config(format!(
                "agent '{}': max_concurrency must be at least 1",
                self.name
            )));
        }
        if self.max_queue_size == Some(0) {
            return Err(ConductorError::Config(format!(
                "agent '{}': max_queue_size must be at least 1",
                self.name
            )));
        }
        Ok(())
    }

    /// The discovery view of this descriptor (no queue or runtime settings).
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            capabilities: self.capabilities.clone(),
            role: self.role,
        }
    }
}

fn dedup<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.into();
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// What `discover_agents` returns for each agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub capabilities: Vec<String>,
    pub role: AgentRole,
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Completed, Failed and Cancelled are final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One unit of work submitted to an agent's queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub agent_name: String,
    pub payload: TaskPayload,
    pub status: TaskStatus,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set iff `status == Completed`.
    pub result: Option<String>,
    /// Set iff `status == Failed`.
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn new(id: TaskId, agent_name: impl Into<String>, payload: TaskPayload) -> Self {
        Self {
            id,
            agent_name: agent_name.into(),
            payload,
            status: TaskStatus::Queued,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Wall-clock execution time, once the task has both started and finished.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Point-in-time snapshot of one agent queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub agent_name: String,
    pub pending_count: usize,
    pub running_count: usize,
    pub paused: bool,
    pub max_concurrency: usize,
    pub max_queue_size: Option<usize>,
    pub total_enqueued: u64,
    /// Tasks that reached Completed or Failed.
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_cancelled: u64,
}
