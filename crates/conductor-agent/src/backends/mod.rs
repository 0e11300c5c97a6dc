pub mod echo;
pub mod http;

pub use echo::EchoAgent;
pub use http::HttpAgent;

use crate::config::BackendConfig;
use conductor_core::{AgentCapability, ConductorResult};
use std::sync::Arc;
use std::time::Duration;

/// Instantiate the capability described by a backend config.
///
/// To add a backend:
/// 1. Create a module in `backends/` implementing `AgentCapability`
/// 2. Add a variant to `BackendConfig` in `config.rs`
/// 3. Wire it up here
pub fn build_capability(config: &BackendConfig) -> ConductorResult<Arc<dyn AgentCapability>> {
    match config {
        BackendConfig::Echo { prefix, delay_ms } => Ok(Arc::new(
            EchoAgent::new()
                .with_prefix(prefix.clone())
                .with_delay(Duration::from_millis(*delay_ms)),
        )),
        BackendConfig::Http(http) => Ok(Arc::new(HttpAgent::from_config(http.clone())?)),
    }
}
