use thiserror::Error;

/// A convenience `Result` alias using [`ConductorError`].
pub type ConductorResult<T> = Result<T, ConductorError>;

/// Top-level error type for Conductor.
///
/// Variants map one-to-one onto the `{kind, message}` error objects returned
/// to tool callers, see [`ConductorError::kind`].
#[derive(Error, Debug)]
pub enum ConductorError {
    /// Registration of a name that is already taken.
    #[error("Agent '{0}' is already registered")]
    DuplicateAgent(String),

    /// A tool call referenced an agent that is not registered.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// A tool name matched neither an agent nor a management tool.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Enqueue rejected because the agent's pending queue is at capacity.
    #[error("Queue for agent '{agent}' is full ({capacity} pending)")]
    QueueFull {
        /// Agent whose queue rejected the task.
        agent: String,
        /// Configured pending capacity.
        capacity: usize,
    },

    /// A search referenced a descriptor field that does not exist.
    #[error("Invalid search field: {0}")]
    InvalidField(String),

    /// The agent capability raised an error or timed out.
    #[error("Invocation failed: {0}")]
    InvocationFailure(String),

    /// Status query for an id that was never issued (or was evicted).
    #[error("Task not found: {0}")]
    TaskNotFound(u64),

    /// A synchronous caller's task was cleared before it started.
    #[error("Task {0} was cancelled before it started")]
    TaskCancelled(u64),

    /// A synchronous caller's task was still waiting when the server began
    /// shutting down.
    #[error("Server is shutting down; task {0} was abandoned")]
    ShuttingDown(u64),

    /// Tool arguments did not match the tool's input schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request made by an agent backend.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConductorError {
    /// Stable snake_case identifier for the error, used as `kind` on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ConductorError::DuplicateAgent(_) => "duplicate_agent",
            ConductorError::UnknownAgent(_) => "unknown_agent",
            ConductorError::UnknownTool(_) => "unknown_tool",
            ConductorError::QueueFull { .. } => "queue_full",
            ConductorError::InvalidField(_) => "invalid_field",
            ConductorError::InvocationFailure(_) => "invocation_failure",
            ConductorError::TaskNotFound(_) => "task_not_found",
            ConductorError::TaskCancelled(_) => "task_cancelled",
            ConductorError::ShuttingDown(_) => "shutting_down",
            ConductorError::InvalidArguments(_) => "invalid_arguments",
            ConductorError::Config(_) => "config",
            ConductorError::Http(_) => "http",
            ConductorError::Json(_) => "json",
            ConductorError::Io(_) => "io",
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConductorError::QueueFull { .. }
                | ConductorError::ShuttingDown(_)
                | ConductorError::Http(_)
        )
    }

    /// The `{kind, message}` object returned to tool callers.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        })
    }
}
