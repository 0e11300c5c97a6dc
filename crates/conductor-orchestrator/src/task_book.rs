use crate::types::{TaskId, TaskRecord, TaskStatus};
use chrono::Utc;
use conductor_core::{ConductorError, ConductorResult, TaskPayload};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::debug;

struct TaskEntry {
    record: TaskRecord,
    status_tx: watch::Sender<TaskStatus>,
}

#[derive(Default)]
struct BookInner {
    entries: HashMap<TaskId, TaskEntry>,
    /// Terminal task ids in the order they finished, for history eviction.
    finished: VecDeque<TaskId>,
}

/// Process-wide record of every task, keyed by id.
///
/// Queues decide *when* a task changes state; the book stores the record and
/// publishes each transition on a per-task watch channel so synchronous
/// callers can wait without holding any lock. Transitions out of a terminal
/// state are ignored.
pub struct TaskBook {
    next_id: AtomicU64,
    inner: Mutex<BookInner>,
    history_limit: Option<usize>,
}

impl TaskBook {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            inner: Mutex::new(BookInner::default()),
            history_limit: None,
        }
    }

    /// Keep at most `limit` terminal records; older ones are forgotten.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Allocate an id and store a fresh Queued record.
    pub(crate) fn create(&self, agent_name: &str, payload: TaskPayload) -> TaskId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = TaskRecord::new(id, agent_name, payload);
        let (status_tx, _) = watch::channel(TaskStatus::Queued);
        self.inner
            .lock()
            .entries
            .insert(id, TaskEntry { record, status_tx });
        id
    }

    /// Snapshot of a task record.
    pub fn get(&self, id: TaskId) -> ConductorResult<TaskRecord> {
        self.inner
            .lock()
            .entries
            .get(&id)
            .map(|e| e.record.clone())
            .ok_or(ConductorError::TaskNotFound(id))
    }

    /// Watch a task's status transitions.
    pub fn subscribe(&self, id: TaskId) -> ConductorResult<watch::Receiver<TaskStatus>> {
        self.inner
            .lock()
            .entries
            .get(&id)
            .map(|e| e.status_tx.subscribe())
            .ok_or(ConductorError::TaskNotFound(id))
    }

    /// Wait until the task reaches a terminal state and return its record.
    pub async fn wait(&self, id: TaskId) -> ConductorResult<TaskRecord> {
        let mut rx = self.subscribe(id)?;
        if rx.wait_for(|status| status.is_terminal()).await.is_err() {
            // Sender dropped: the record was evicted from history.
            return Err(ConductorError::TaskNotFound(id));
        }
        self.get(id)
    }

    /// Queued → Running. Returns the payload to hand to the capability.
    pub(crate) fn mark_running(&self, id: TaskId) -> Option<TaskPayload> {
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(&id)?;
        if entry.record.status != TaskStatus::Queued {
            return None;
        }
        entry.record.status = TaskStatus::Running;
        entry.record.started_at = Some(Utc::now());
        entry.status_tx.send_replace(TaskStatus::Running);
        Some(entry.record.payload.clone())
    }

    pub(crate) fn mark_completed(&self, id: TaskId, result: String) {
        self.finish(id, TaskStatus::Completed, |rec| rec.result = Some(result));
    }

    pub(crate) fn mark_failed(&self, id: TaskId, error: String) {
        self.finish(id, TaskStatus::Failed, |rec| rec.error = Some(error));
    }

    pub(crate) fn mark_cancelled(&self, id: TaskId) {
        self.finish(id, TaskStatus::Cancelled, |_| {});
    }

    fn finish(&self, id: TaskId, status: TaskStatus, apply: impl FnOnce(&mut TaskRecord)) {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.entries.get_mut(&id) else {
            return;
        };
        if entry.record.status.is_terminal() {
            return;
        }
        entry.record.status = status;
        entry.record.completed_at = Some(Utc::now());
        apply(&mut entry.record);
        entry.status_tx.send_replace(status);

        inner.finished.push_back(id);
        if let Some(limit) = self.history_limit {
            while inner.finished.len() > limit {
                if let Some(old) = inner.finished.pop_front() {
                    inner.entries.remove(&old);
                    debug!(task_id = old, "Evicted task from history");
                }
            }
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of held records per status.
    pub fn status_counts(&self) -> HashMap<TaskStatus, usize> {
        let inner = self.inner.lock();
        let mut counts = HashMap::new();
        for entry in inner.entries.values() {
            *counts.entry(entry.record.status).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for TaskBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_ids_are_monotonic() {
        let book = TaskBook::new();
        let a = book.create("Echo", TaskPayload::new("a"));
        let b = book.create("Echo", TaskPayload::new("b"));
        let c = book.create("Other", TaskPayload::new("c"));
        assert!(a < b && b < c);
        assert_eq!(book.len(), 3);
    }

    #[test]
    fn test_unknown_id() {
        let book = TaskBook::new();
        assert!(matches!(
            book.get(99),
            Err(ConductorError::TaskNotFound(99))
        ));
    }

    #[test]
    fn test_lifecycle_completed() {
        let book = TaskBook::new();
        let id = book.create("Echo", TaskPayload::new("a"));

        let payload = book.mark_running(id).unwrap();
        assert_eq!(payload.task, "a");
        assert!(book.get(id).unwrap().started_at.is_some());

        book.mark_completed(id, "done".into());
        let rec = book.get(id).unwrap();
        assert_eq!(rec.status, TaskStatus::Completed);
        assert_eq!(rec.result.as_deref(), Some("done"));
        assert!(rec.error.is_none());
        assert!(rec.completed_at.is_some());
    }

    #[test]
    fn test_terminal_is_immutable() {
        let book = TaskBook::new();
        let id = book.create("Echo", TaskPayload::new("a"));
        book.mark_cancelled(id);
        assert!(book.mark_running(id).is_none());
        book.mark_completed(id, "late".into());

        let rec = book.get(id).unwrap();
        assert_eq!(rec.status, TaskStatus::Cancelled);
        assert!(rec.result.is_none());
    }

    #[test]
    fn test_history_limit_evicts_oldest_terminal() {
        let book = TaskBook::with_history_limit(1);
        let a = book.create("Echo", TaskPayload::new("a"));
        let b = book.create("Echo", TaskPayload::new("b"));
        let queued = book.create("Echo", TaskPayload::new("c"));

        book.mark_cancelled(a);
        book.mark_cancelled(b);

        assert!(book.get(a).is_err());
        assert!(book.get(b).is_ok());
        // Non-terminal records are never evicted.
        assert!(book.get(queued).is_ok());
    }

    #[test]
    fn test_status_counts() {
        let book = TaskBook::new();
        let a = book.create("Echo", TaskPayload::new("a"));
        book.create("Echo", TaskPayload::new("b"));
        book.mark_running(a);
        book.mark_failed(a, "boom".into());

        let counts = book.status_counts();
        assert_eq!(counts.get(&TaskStatus::Failed), Some(&1));
        assert_eq!(counts.get(&TaskStatus::Queued), Some(&1));
    }

    #[tokio::test]
    async fn test_wait_returns_terminal_record() {
        let book = Arc::new(TaskBook::new());
        let id = book.create("Echo", TaskPayload::new("a"));

        let waiter = {
            let book = book.clone();
            tokio::spawn(async move { book.wait(id).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        book.mark_running(id);
        book.mark_completed(id, "ok".into());

        let rec = waiter.await.unwrap().unwrap();
        assert_eq!(rec.status, TaskStatus::Completed);
        assert_eq!(rec.result.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_wait_on_already_finished_task() {
        let book = TaskBook::new();
        let id = book.create("Echo", TaskPayload::new("a"));
        book.mark_cancelled(id);
        let rec = book.wait(id).await.unwrap();
        assert_eq!(rec.status, TaskStatus::Cancelled);
    }
}
