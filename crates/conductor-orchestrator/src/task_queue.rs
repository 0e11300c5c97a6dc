use crate::task_book::TaskBook;
use crate::types::{AgentDescriptor, QueueStats, TaskId};
use conductor_core::{ConductorError, ConductorResult, TaskPayload};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<TaskId>,
    running: HashSet<TaskId>,
    paused: bool,
    total_enqueued: u64,
    total_processed: u64,
    total_failed: u64,
    total_cancelled: u64,
}

/// Pending work and runtime state for one agent.
///
/// Every mutation of `pending`, `running` and `paused` happens under a single
/// mutex held only for the mutation itself, so enqueue, dequeue, pause,
/// resume and clear are serialized per agent while invocations run unlocked.
/// A task id is in at most one of `pending` and `running`, and
/// `running.len() <= max_concurrency` always holds.
pub struct AgentQueue {
    agent_name: String,
    max_concurrency: usize,
    capacity: Option<usize>,
    state: Mutex<QueueState>,
    book: Arc<TaskBook>,
    ready: Notify,
}

impl AgentQueue {
    pub fn new(descriptor: &AgentDescriptor, book: Arc<TaskBook>) -> Self {
        Self {
            agent_name: descriptor.name.clone(),
            max_concurrency: descriptor.max_concurrency.max(1),
            capacity: descriptor.max_queue_size,
            state: Mutex::new(QueueState::default()),
            book,
            ready: Notify::new(),
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Append a new Queued task at the tail.
    pub fn enqueue(&self, payload: TaskPayload) -> ConductorResult<TaskId> {
        let id = {
            let mut state = self.state.lock();
            if let Some(capacity) = self.capacity {
                if state.pending.len() >= capacity {
                    return Err(ConductorError::QueueFull {
                        agent: self.agent_name.clone(),
                        capacity,
                    });
                }
            }
            let id = self.book.create(&self.agent_name, payload);
            state.pending.push_back(id);
            state.total_enqueued += 1;
            id
        };
        debug!(agent = %self.agent_name, task_id = id, "Task enqueued");
        self.ready.notify_waiters();
        Ok(id)
    }

    /// Stop dequeuing. Running tasks continue.
    pub fn pause(&self) {
        self.state.lock().paused = true;
        info!(agent = %self.agent_name, "Queue paused");
    }

    /// Make pending tasks eligible for dequeue again.
    pub fn resume(&self) {
        self.state.lock().paused = false;
        info!(agent = %self.agent_name, "Queue resumed");
        self.ready.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Cancel every pending task. Running tasks are left alone.
    pub fn clear(&self) -> usize {
        let cleared = {
            let mut state = self.state.lock();
            let drained: Vec<TaskId> = state.pending.drain(..).collect();
            for id in &drained {
                self.book.mark_cancelled(*id);
            }
            state.total_cancelled += drained.len() as u64;
            drained.len()
        };
        info!(agent = %self.agent_name, cleared, "Queue cleared");
        cleared
    }

    /// Consistent snapshot of the queue.
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            agent_name: self.agent_name.clone(),
            pending_count: state.pending.len(),
            running_count: state.running.len(),
            paused: state.paused,
            max_concurrency: self.max_concurrency,
            max_queue_size: self.capacity,
            total_enqueued: state.total_enqueued,
            total_processed: state.total_processed,
            total_failed: state.total_failed,
            total_cancelled: state.total_cancelled,
        }
    }

    /// Ids of pending tasks in dequeue order.
    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.state.lock().pending.iter().copied().collect()
    }

    /// Pop the head of `pending` into `running` if the queue is eligible.
    pub(crate) fn try_dequeue(&self) -> Option<(TaskId, TaskPayload)> {
        let mut state = self.state.lock();
        if state.paused || state.running.len() >= self.max_concurrency {
            return None;
        }
        while let Some(id) = state.pending.pop_front() {
            if let Some(payload) = self.book.mark_running(id) {
                state.running.insert(id);
                return Some((id, payload));
            }
        }
        None
    }

    /// Wait for the next dequeuable task.
    pub(crate) async fn next_task(&self) -> (TaskId, TaskPayload) {
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(next) = self.try_dequeue() {
                return next;
            }
            notified.await;
        }
    }

    /// Record the outcome of a running task and release its slot.
    pub(crate) fn finish(&self, id: TaskId, outcome: ConductorResult<String>) {
        {
            let mut state = self.state.lock();
            if !state.running.remove(&id) {
                return;
            }
            state.total_processed += 1;
            match outcome {
                Ok(result) => self.book.mark_completed(id, result),
                Err(e) => {
                    state.total_failed += 1;
                    self.book.mark_failed(id, e.to_string());
                }
            }
        }
        self.ready.notify_waiters();
    }
}
