use conductor_agent::BackendConfig;
use conductor_mcp::CallMode;
use conductor_orchestrator::{AgentDescriptor, AgentRole};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ConductorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub call_mode: CallMode,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: String::new(),
            host: default_host(),
            port: default_port(),
            call_mode: CallMode::default(),
            log_level: default_log_level(),
        }
    }
}

/// Defaults applied to agents that do not set their own limits.
#[derive(Debug, Default, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub max_queue_size: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Terminal task records kept for `get_task_status`; unbounded if unset.
    #[serde(default)]
    pub task_history_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub role: AgentRole,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub max_queue_size: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_name() -> String {
    "conductor".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_concurrency() -> usize {
    1
}

impl ConductorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

impl AgentConfig {
    /// The descriptor to register, with `[queue]` defaults filled in.
    pub fn descriptor(&self, defaults: &QueueConfig) -> AgentDescriptor {
        let mut desc = AgentDescriptor::new(&self.name, &self.description)
            .with_tags(self.tags.iter().cloned())
            .with_capabilities(self.capabilities.iter().cloned())
            .with_role(self.role)
            .with_max_concurrency(self.max_concurrency);
        if let Some(size) = self.max_queue_size.or(defaults.max_queue_size) {
            desc = desc.with_max_queue_size(size);
        }
        if let Some(secs) = self.timeout_secs.or(defaults.timeout_secs) {
            desc = desc.with_timeout(Duration::from_secs(secs));
        }
        desc
    }
}
