//! Caller-facing coalescer: submission entry points and instance lifecycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::source::{BatchSource, SimulatedSource};
use crate::telemetry;

use super::dispatch;
use super::policy::FlushPolicy;
use super::queue::PendingQueue;
use super::task::{ResponseRx, Task, TaskOutcome};
use super::worker;

/// State shared between the coalescer handle and its scheduler loop.
pub(crate) struct Shared {
    pub(crate) config: SchedulerConfig,
    pub(crate) policy: FlushPolicy,
    pub(crate) source: Arc<dyn BatchSource>,
    pub(crate) queue: Mutex<PendingQueue>,
    /// Outcomes of poll-mode tasks, keyed by task id. Entries are removed
    /// on retrieval, which is what makes observation exactly-once.
    pub(crate) completed: DashMap<u64, TaskOutcome>,
    /// Wakes the scheduler loop out of IDLE.
    pub(crate) notify: Notify,
    /// True while the scheduler loop is ticking.
    pub(crate) ticking: AtomicBool,
    next_id: AtomicU64,
}

impl Shared {
    pub(crate) fn next_task_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Drain every pending task and fail it with `ShuttingDown`, so no
    /// completion signal leaks at shutdown. Idempotent.
    pub(crate) fn fail_pending(&self) {
        loop {
            let batch = {
                let mut queue = self.queue.lock();
                queue.drain_up_to(usize::MAX)
            };
            if batch.is_empty() {
                return;
            }
            tracing::info!(count = batch.len(), "failing pending tasks on shutdown");
            for task in batch {
                dispatch::publish(task, Err(SchedulerError::ShuttingDown), &self.completed);
            }
        }
    }
}

/// Request coalescing scheduler instance.
///
/// One instance per logical request context, shared (via `Arc` or a
/// borrow) by every concurrent caller in that context. Submissions are
/// buffered FIFO and dispatched in bounded batches by a background loop
/// that runs only while work is pending.
pub struct Coalescer {
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Coalescer {
    /// Create an instance backed by the simulated downstream source.
    pub fn new(config: SchedulerConfig) -> Self {
        let latency = config.source_latency();
        Self::with_source(config, Arc::new(SimulatedSource::new(latency)))
    }

    /// Create an instance backed by a caller-provided source.
    pub fn with_source(config: SchedulerConfig, source: Arc<dyn BatchSource>) -> Self {
        let shared = Arc::new(Shared {
            policy: FlushPolicy::from_config(&config),
            config,
            source,
            queue: Mutex::new(PendingQueue::new()),
            completed: DashMap::new(),
            notify: Notify::new(),
            ticking: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        });
        let shutdown = CancellationToken::new();
        let worker = worker::spawn_scheduler(Arc::clone(&shared), shutdown.clone());
        Self {
            shared,
            shutdown,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Submit a key and await its result (push mode).
    pub async fn submit(&self, key: u64) -> Result<String, SchedulerError> {
        let (_id, rx) = self.enqueue_with_response(key)?;
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(SchedulerError::CompletionDropped),
        }
    }

    /// Enqueue a push-mode task. Returns its id and the receiver the
    /// caller awaits. The enqueue itself is synchronous, so submission
    /// order is the order of these calls.
    pub fn enqueue_with_response(&self, key: u64) -> Result<(u64, ResponseRx), SchedulerError> {
        if self.shutdown.is_cancelled() {
            return Err(SchedulerError::ShuttingDown);
        }
        let id = self.shared.next_task_id();
        let (task, rx) = Task::with_channel(id, key);
        self.enqueue(task, "push");
        Ok((id, rx))
    }

    /// Enqueue a poll-mode task and return its id. The outcome is later
    /// retrieved with [`take_result`](Self::take_result).
    pub fn enqueue_detached(&self, key: u64) -> Result<u64, SchedulerError> {
        if self.shutdown.is_cancelled() {
            return Err(SchedulerError::ShuttingDown);
        }
        let id = self.shared.next_task_id();
        self.enqueue(Task::detached(id, key), "poll");
        Ok(id)
    }

    /// Remove and return a poll-mode task's outcome, if it has reached a
    /// terminal status. Each outcome can be taken exactly once.
    pub fn take_result(&self, task_id: u64) -> Option<TaskOutcome> {
        self.shared.completed.remove(&task_id).map(|(_, outcome)| outcome)
    }

    /// Submit a key and await its result by polling (poll mode).
    ///
    /// Sleeps the configured poll interval between checks. Each poll also
    /// nudges the scheduler loop - a wake hint kept from the original
    /// poll-driven design; the background loop is the real driver, so a
    /// caller's poll cadence never gates other callers' progress.
    pub async fn submit_polling(&self, key: u64) -> Result<String, SchedulerError> {
        let id = self.enqueue_detached(key)?;
        let interval = self.shared.config.poll_interval();
        loop {
            tokio::time::sleep(interval).await;
            self.shared.notify.notify_one();
            if let Some(outcome) = self.take_result(id) {
                return outcome;
            }
        }
    }

    fn enqueue(&self, task: Task, mode: &'static str) {
        tracing::trace!(task_id = task.id, key = task.requested_key, mode, "task enqueued");
        telemetry::record_submission(mode);
        {
            let mut queue = self.shared.queue.lock();
            queue.push(task);
        }
        self.shared.notify.notify_one();
        // A shutdown that landed while we were pushing may already have
        // swept the queue; re-run the sweep so this task cannot leak.
        if self.shutdown.is_cancelled() {
            self.shared.fail_pending();
        }
    }

    /// Number of tasks waiting to be claimed by a flush.
    pub fn pending_count(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Number of unretrieved poll-mode outcomes.
    pub fn completed_count(&self) -> usize {
        self.shared.completed.len()
    }

    /// True when the scheduler loop is parked (empty queue, no ticking).
    pub fn is_idle(&self) -> bool {
        !self.shared.ticking.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Stop the scheduler loop and fail every still-pending task with
    /// [`SchedulerError::ShuttingDown`]. Further submissions are rejected.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        // Sweep anything that raced in between cancel and worker exit.
        self.shared.fail_pending();
    }
}

impl Drop for Coalescer {
    fn drop(&mut self) {
        // Stop the loop even if shutdown() was never called.
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Coalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer")
            .field("config", &self.shared.config)
            .field("pending", &self.pending_count())
            .field("idle", &self.is_idle())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "coalescer_tests.rs"]
mod tests;
