//! Pending task queue.
//!
//! FIFO by submission order. Mutated only by submissions and by the single
//! in-flight flush; the coalescer guards it with a mutex that is never
//! held across an await.

use std::collections::VecDeque;

use tokio::time::Instant;

use crate::telemetry;

use super::task::{Task, TaskStatus};

/// Ordered buffer of not-yet-dispatched tasks plus the last-enqueue stamp.
#[derive(Debug)]
pub struct PendingQueue {
    tasks: VecDeque<Task>,
    last_push: Instant,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
            last_push: Instant::now(),
        }
    }

    /// Append a task and stamp the enqueue time. Never rejects on queue
    /// state.
    pub fn push(&mut self, task: Task) {
        self.tasks.push_back(task);
        self.last_push = Instant::now();
        telemetry::record_queue_depth(self.tasks.len());
    }

    /// Remove and return up to `max` leading tasks, claiming each for
    /// dispatch (status -> `Processing`).
    ///
    /// A dequeued task that is already `Done` stops the drain: its
    /// completion has fired, so redispatching it would double-fire. The
    /// stale task is dropped, the remaining queue is left for the next
    /// cycle, and the event is logged rather than propagated. Under the
    /// single-consumer drain discipline this branch is unreachable; it
    /// guards against a corrupted queue.
    pub fn drain_up_to(&mut self, max: usize) -> Vec<Task> {
        let mut batch = Vec::with_capacity(max.min(self.tasks.len()));
        while batch.len() < max {
            let Some(mut task) = self.tasks.pop_front() else {
                break;
            };
            if task.status == TaskStatus::Done {
                tracing::warn!(
                    task_id = task.id,
                    key = task.requested_key,
                    "dequeued task already done; halting drain"
                );
                telemetry::record_stale_drop();
                break;
            }
            task.status = TaskStatus::Processing;
            batch.push(task);
        }
        telemetry::record_queue_depth(self.tasks.len());
        batch
    }

    /// Instant of the most recent enqueue.
    pub fn last_push(&self) -> Instant {
        self.last_push
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new()
    }
}
