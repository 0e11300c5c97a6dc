use crate::{ConductorResult, TaskPayload};
use async_trait::async_trait;

/// The opaque "brain" behind a registered agent.
///
/// The orchestrator never looks inside an agent: it hands over the task
/// payload and records whatever comes back. Implementations may call a model
/// API, a subprocess, or answer in-process; the only contract is that the
/// returned future eventually resolves. An `Err` is recorded on the task as a
/// failed invocation.
///
/// To add a new backend:
/// 1. Implement `AgentCapability` for your struct
/// 2. Register it together with an `AgentDescriptor` in the `AgentRegistry`
#[async_trait]
pub trait AgentCapability: Send + Sync {
    /// Run one task to completion and return its free-form result.
    async fn invoke(&self, payload: &TaskPayload) -> ConductorResult<String>;
}
