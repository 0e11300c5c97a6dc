use serde::{Deserialize, Serialize};

/// How an agent's capability is provided, as written in the `backend` table
/// of an `[[agents]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Returns the task text, optionally prefixed. For smoke tests and demos.
    Echo {
        #[serde(default)]
        prefix: String,
        /// Artificial latency per invocation, in milliseconds.
        #[serde(default)]
        delay_ms: u64,
    },
    /// Forwards the payload to an external service over HTTP.
    Http(HttpBackendConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Echo {
            prefix: String::new(),
            delay_ms: 0,
        }
    }
}

/// Request/response shape spoken by an HTTP backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpFormat {
    /// POST the task payload as JSON; read `result`, `output` or `text` from
    /// the response, or the raw body when it is not JSON.
    #[default]
    Payload,
    /// OpenAI-compatible `/v1/chat/completions`.
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpBackendConfig {
    /// Full endpoint URL for `payload`, base URL for `openai`.
    pub url: String,
    #[serde(default)]
    pub format: HttpFormat,
    /// Environment variable holding a bearer token.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// System prompt sent ahead of the task in `openai` format.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    4096
}

impl HttpBackendConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: HttpFormat::Payload,
            api_key_env: None,
            model: None,
            system_prompt: None,
            max_tokens: default_max_tokens(),
        }
    }

    /// Endpoint the backend posts to.
    pub fn endpoint(&self) -> String {
        let base = self.url.trim_end_matches('/');
        match self.format {
            HttpFormat::Payload => base.to_string(),
            HttpFormat::OpenAi => format!("{base}/v1/chat/completions"),
        }
    }
}
