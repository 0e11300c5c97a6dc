//! Capability backends for Conductor agents.
//!
//! Each registered agent is backed by an [`AgentCapability`](conductor_core::AgentCapability).
//! This crate provides the stock implementations and the config that selects
//! them from `conductor.toml`.
//!
//! # Main types
//!
//! - [`EchoAgent`] — Returns the task text; for smoke tests and demos.
//! - [`HttpAgent`] — Forwards the payload to a remote service or an OpenAI-compatible API.
//! - [`BackendConfig`] — The `backend` table of an agent entry.
//! - [`build_capability`] — Turns a [`BackendConfig`] into a capability.

/// Stock capability implementations.
pub mod backends;
/// Backend selection config.
pub mod config;

pub use backends::{build_capability, EchoAgent, HttpAgent};
pub use config::{BackendConfig, HttpBackendConfig, HttpFormat};
