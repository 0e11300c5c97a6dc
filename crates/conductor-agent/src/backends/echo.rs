use async_trait::async_trait;
use conductor_core::{AgentCapability, ConductorResult, TaskPayload};
use std::time::Duration;

/// Answers every task with its own text.
#[derive(Debug, Clone, Default)]
pub struct EchoAgent {
    prefix: String,
    delay: Duration,
}

impl EchoAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl AgentCapability for EchoAgent {
    async fn invoke(&self, payload: &TaskPayload) -> ConductorResult<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(format!("{}{}", self.prefix, payload.task))
    }
}
