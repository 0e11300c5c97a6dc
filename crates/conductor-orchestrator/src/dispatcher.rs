use crate::registry::{AgentEntry, AgentRegistry};
use crate::types::TaskId;
use conductor_core::{ConductorError, ConductorResult, TaskPayload};
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Drains agent queues and runs their capabilities.
///
/// Each agent gets `max_concurrency` workers. A worker waits for a dequeuable
/// task, invokes the capability outside every queue lock, then records the
/// outcome. Agents are scheduled independently of each other.
pub struct Dispatcher {
    registry: Arc<AgentRegistry>,
    workers: Mutex<HashMap<String, Vec<JoinHandle<()>>>>,
    shutdown: watch::Sender<bool>,
}

impl Dispatcher {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry,
            workers: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Spawn workers for every registered agent that has none yet.
    ///
    /// Safe to call again after late registrations. Returns how many agents
    /// were newly attached.
    pub fn start(&self) -> usize {
        let mut workers = self.workers.lock();
        let mut attached = 0;
        for entry in self.registry.entries() {
            if workers.contains_key(&entry.descriptor.name) {
                continue;
            }
            let handles: Vec<JoinHandle<()>> = (0..entry.descriptor.max_concurrency)
                .map(|slot| {
                    tokio::spawn(worker_loop(
                        entry.clone(),
                        slot,
                        self.shutdown.subscribe(),
                    ))
                })
                .collect();
            info!(
                agent = %entry.descriptor.name,
                workers = handles.len(),
                "Dispatcher: workers started"
            );
            workers.insert(entry.descriptor.name.clone(), handles);
            attached += 1;
        }
        attached
    }

    /// Flips to `true` once [`shutdown`](Self::shutdown) starts.
    pub fn shutdown_listener(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Number of agents with running workers.
    pub fn attached_agents(&self) -> usize {
        self.workers.lock().len()
    }

    /// Stop every worker. In-flight invocations are abandoned and their tasks
    /// recorded as Failed; pending tasks stay Queued.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let handles: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .drain()
            .flat_map(|(_, handles)| handles)
            .collect();
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                warn!(error = %e, "Dispatcher worker ended abnormally");
            }
        }
        info!("Dispatcher: shut down");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

async fn worker_loop(entry: Arc<AgentEntry>, slot: usize, mut shutdown: watch::Receiver<bool>) {
    let agent = entry.descriptor.name.clone();
    debug!(agent = %agent, slot, "Worker idle");

    loop {
        let (task_id, payload) = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => break,
            next = entry.queue.next_task() => next,
        };

        info!(agent = %agent, task_id, slot, "Executing task");
        let start = Instant::now();

        let mut invocation = tokio::spawn(invoke(entry.clone(), payload));
        let outcome = tokio::select! {
            joined = &mut invocation => match joined {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => Err(ConductorError::InvocationFailure(
                    "agent capability panicked".to_string(),
                )),
                Err(e) => Err(ConductorError::InvocationFailure(e.to_string())),
            },
            _ = shutdown.wait_for(|stop| *stop) => {
                invocation.abort();
                finish(&entry, task_id, Err(ConductorError::InvocationFailure(
                    "dispatcher shut down".to_string(),
                )), start);
                break;
            }
        };

        finish(&entry, task_id, outcome, start);
    }

    debug!(agent = %agent, slot, "Worker stopped");
}

fn finish(entry: &AgentEntry, task_id: TaskId, outcome: ConductorResult<String>, start: Instant) {
    let duration_ms = start.elapsed().as_millis() as u64;
    let agent = &entry.descriptor.name;
    match &outcome {
        Ok(_) => info!(agent = %agent, task_id, duration_ms, "Task completed"),
        Err(e) => error!(agent = %agent, task_id, duration_ms, error = %e, "Task failed"),
    }
    entry.queue.finish(task_id, outcome);
}

/// Run the capability, applying the agent's timeout. Any error becomes an
/// invocation failure on the task.
async fn invoke(entry: Arc<AgentEntry>, payload: TaskPayload) -> ConductorResult<String> {
    let call = entry.capability.invoke(&payload);
    let outcome = match entry.descriptor.timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Err(ConductorError::InvocationFailure(format!(
                    "timed out after {}ms",
                    limit.as_millis()
                )))
            }
        },
        None => call.await,
    };
    outcome.map_err(|e| match e {
        ConductorError::InvocationFailure(_) => e,
        other => ConductorError::InvocationFailure(other.to_string()),
    })
}
