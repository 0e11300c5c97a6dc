//! Agent registry, per-agent task queues, and the dispatcher.
//!
//! Implements the queueing engine behind the Conductor tool surface: agents
//! are registered with a descriptor and an opaque capability, each gets its
//! own FIFO queue with pause/resume/clear and a concurrency limit, and the
//! dispatcher drains those queues with one worker pool per agent while the
//! task book tracks every submitted task through its lifecycle.
//!
//! # Main types
//!
//! - [`AgentRegistry`] — Owns descriptors and queues; registration, lookup, discovery, search.
//! - [`AgentQueue`] — Pending and running tasks of one agent, with pause state and counters.
//! - [`Dispatcher`] — Worker pools that invoke capabilities and resolve task records.
//! - [`TaskBook`] — Process-wide task records, readable by id, awaitable until terminal.
//! - [`AgentDescriptor`] — Static identity and routing metadata for one agent.

/// Worker pools draining agent queues.
pub mod dispatcher;
/// Agent registration, lookup, discovery and search.
pub mod registry;
/// Task records keyed by id, with completion notification.
pub mod task_book;
/// Per-agent FIFO queue with concurrency control.
pub mod task_queue;
/// Shared orchestration types (AgentDescriptor, TaskRecord, QueueStats, etc.).
pub mod types;

pub use dispatcher::Dispatcher;
pub use registry::{AgentEntry, AgentRegistry, RegistrationOutcome, SearchField};
pub use task_book::TaskBook;
pub use task_queue::AgentQueue;
pub use types::{AgentDescriptor, AgentRole, AgentSummary, QueueStats, TaskId, TaskRecord, TaskStatus};
