//! Core types and error definitions for the Conductor orchestration server.
//!
//! This crate provides the foundational types shared across all Conductor
//! crates: the error taxonomy surfaced to tool callers, the task payload
//! submitted to agents, the capability contract every agent backend
//! implements, and the tool call abstractions used by the gateway.
//!
//! # Main types
//!
//! - [`ConductorError`] — Unified error enum; every variant has a stable [`kind`](ConductorError::kind).
//! - [`ConductorResult`] — Convenience alias for `Result<T, ConductorError>`.
//! - [`TaskPayload`] — The input of one unit of work (`task`, images, evaluation hint).
//! - [`AgentCapability`] — The opaque `invoke(payload)` collaborator behind each agent.
//! - [`ToolCall`] / [`ToolResult`] — A named RPC invocation and its structured outcome.

/// The agent capability contract.
pub mod capability;
/// Error taxonomy.
pub mod error;
/// Task payload submitted to agent queues.
pub mod payload;
/// Tool call and result types.
pub mod tool;

pub use capability::AgentCapability;
pub use error::{ConductorError, ConductorResult};
pub use payload::TaskPayload;
pub use tool::{ToolCall, ToolResult};
