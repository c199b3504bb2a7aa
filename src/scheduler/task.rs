//! Task type: one caller's pending request plus its terminal outcome.

use tokio::sync::oneshot;

use crate::error::SchedulerError;

/// Terminal or in-flight outcome of a task, as delivered to its caller.
pub type TaskOutcome = Result<String, SchedulerError>;

/// Sender half of a task's one-shot completion signal.
pub type ResponseTx = oneshot::Sender<TaskOutcome>;
/// Receiver half for awaiting a task's result.
pub type ResponseRx = oneshot::Receiver<TaskOutcome>;

/// Task lifecycle. `Waiting` while queued, `Processing` once claimed by a
/// dispatch, then exactly one of `Done` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Waiting,
    Processing,
    Done,
    Error,
}

/// A queued lookup request.
///
/// `completion` is `Some` for push-mode tasks (the caller awaits the
/// oneshot) and `None` for poll-mode tasks (the outcome is parked in the
/// coalescer's completed map instead). Taking the sender on publish is
/// what makes the fire-exactly-once invariant structural.
#[derive(Debug)]
pub struct Task {
    /// Unique per scheduler instance, monotonically assigned.
    pub id: u64,
    /// The domain key to resolve; may repeat across tasks.
    pub requested_key: u64,
    pub status: TaskStatus,
    /// Set exactly once, on transition to `Done`.
    pub result: Option<String>,
    pub completion: Option<ResponseTx>,
}

impl Task {
    /// Create a push-mode task along with the receiver its caller awaits.
    pub fn with_channel(id: u64, requested_key: u64) -> (Self, ResponseRx) {
        let (tx, rx) = oneshot::channel();
        let task = Self {
            id,
            requested_key,
            status: TaskStatus::Waiting,
            result: None,
            completion: Some(tx),
        };
        (task, rx)
    }

    /// Create a poll-mode task; its outcome is retrieved by id.
    pub fn detached(id: u64, requested_key: u64) -> Self {
        Self {
            id,
            requested_key,
            status: TaskStatus::Waiting,
            result: None,
            completion: None,
        }
    }

    /// Whether the task has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Done | TaskStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_channel_starts_waiting() {
        let (task, _rx) = Task::with_channel(1, 42);
        assert_eq!(task.status, TaskStatus::Waiting);
        assert_eq!(task.requested_key, 42);
        assert!(task.result.is_none());
        assert!(task.completion.is_some());
        assert!(!task.is_terminal());
    }

    #[test]
    fn detached_has_no_channel() {
        let task = Task::detached(2, 7);
        assert!(task.completion.is_none());
        assert_eq!(task.status, TaskStatus::Waiting);
    }
}
