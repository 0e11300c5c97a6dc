use crate::config::{HttpBackendConfig, HttpFormat};
use async_trait::async_trait;
use conductor_core::{AgentCapability, ConductorError, ConductorResult, TaskPayload};
use tracing::debug;

/// Remote agent reached over HTTP.
///
/// In `payload` format the task payload is POSTed as-is. In `openai` format
/// it becomes a chat completion request against any OpenAI-compatible API
/// (OpenAI, OpenRouter, Groq, Ollama, vLLM).
pub struct HttpAgent {
    config: HttpBackendConfig,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl HttpAgent {
    pub fn new(config: HttpBackendConfig, api_key: Option<String>) -> Self {
        Self {
            config,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    /// Build from config, reading the bearer token from `api_key_env`.
    pub fn from_config(config: HttpBackendConfig) -> ConductorResult<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                ConductorError::Config(format!("environment variable {var} is not set"))
            })?),
            None => None,
        };
        Ok(Self::new(config, api_key))
    }

    fn build_body(&self, payload: &TaskPayload) -> ConductorResult<serde_json::Value> {
        match self.config.format {
            HttpFormat::Payload => {
                let mut body = serde_json::to_value(payload)?;
                if let Some(model) = &self.config.model {
                    body["model"] = serde_json::json!(model);
                }
                Ok(body)
            }
            HttpFormat::OpenAi => {
                let mut messages = Vec::new();
                if let Some(sys) = &self.config.system_prompt {
                    messages.push(serde_json::json!({"role": "system", "content": sys}));
                }
                messages.push(serde_json::json!({
                    "role": "user",
                    "content": build_user_content(payload),
                }));
                Ok(serde_json::json!({
                    "model": self.config.model.as_deref().unwrap_or("gpt-4o-mini"),
                    "max_tokens": self.config.max_tokens,
                    "messages": messages,
                }))
            }
        }
    }
}

/// Plain text when there are no images, multimodal content parts otherwise.
fn build_user_content(payload: &TaskPayload) -> serde_json::Value {
    let images = payload.images();
    if images.is_empty() {
        return serde_json::json!(payload.task);
    }
    let mut parts = vec![serde_json::json!({"type": "text", "text": payload.task})];
    parts.extend(images.into_iter().map(|url| {
        serde_json::json!({"type": "image_url", "image_url": {"url": url}})
    }));
    serde_json::Value::Array(parts)
}

#[async_trait]
impl AgentCapability for HttpAgent {
    async fn invoke(&self, payload: &TaskPayload) -> ConductorResult<String> {
        let url = self.config.endpoint();
        let body = self.build_body(payload)?;

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(url = %url, "Forwarding task to HTTP backend");
        let resp = request
            .send()
            .await
            .map_err(|e| ConductorError::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ConductorError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(ConductorError::Http(format!(
                "backend returned {status}: {text}"
            )));
        }

        match self.config.format {
            HttpFormat::Payload => Ok(parse_payload_response(&text)),
            HttpFormat::OpenAi => parse_openai_response(&serde_json::from_str(&text)?),
        }
    }
}

/// Accepts `{"result": ..}`, `{"output": ..}`, `{"text": ..}` or any other body
/// verbatim.
pub fn parse_payload_response(text: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(text) {
        for key in ["result", "output", "text"] {
            if let Some(value) = map.get(key) {
                return match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
            }
        }
    }
    text.to_string()
}

pub fn parse_openai_response(body: &serde_json::Value) -> ConductorResult<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConductorError::Http(format!("unexpected completion response: {body}")))
}
