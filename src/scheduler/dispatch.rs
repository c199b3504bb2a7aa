//! Batch dispatch: one downstream call, then per-task publication.
//!
//! Outcomes are published in batch order. Push-mode tasks get their
//! oneshot fired; poll-mode tasks land in the completed map. Either way a
//! claimed task always reaches `Done` or `Error` - nothing is left
//! `Processing` forever, including on downstream failure.

use dashmap::DashMap;

use crate::error::SchedulerError;
use crate::source::BatchSource;
use crate::telemetry;

use super::policy::FlushReason;
use super::task::{Task, TaskOutcome, TaskStatus};

/// Execute one downstream call for `batch` and publish every outcome.
///
/// Failures are local to this batch: the error is fanned out to each
/// task's caller and the scheduler loop carries on.
pub(crate) async fn dispatch_batch(
    source: &dyn BatchSource,
    completed: &DashMap<u64, TaskOutcome>,
    batch: Vec<Task>,
    reason: FlushReason,
) {
    let keys: Vec<u64> = batch.iter().map(|task| task.requested_key).collect();
    tracing::debug!(
        batch_size = batch.len(),
        reason = reason.as_str(),
        ?keys,
        "dispatching batch"
    );
    telemetry::record_flush(reason.as_str(), batch.len());

    match source.fetch(&keys).await {
        Ok(values) => publish_success(batch, values, completed),
        Err(err) => {
            tracing::warn!(batch_size = batch.len(), error = %err, "batch dispatch failed");
            telemetry::record_dispatch_failure(batch.len());
            publish_failure(batch, err, completed);
        }
    }
}

fn publish_success(batch: Vec<Task>, values: Vec<String>, completed: &DashMap<u64, TaskOutcome>) {
    let expected = batch.len();
    let got = values.len();
    if got != expected {
        tracing::warn!(expected, got, "source result count mismatch");
    }

    let mut values = values.into_iter();
    for task in batch {
        let outcome = match values.next() {
            Some(value) => Ok(value),
            None => Err(SchedulerError::ResultCountMismatch { expected, got }),
        };
        publish(task, outcome, completed);
    }
    // Surplus values, if any, are dropped with the iterator.
}

fn publish_failure(batch: Vec<Task>, err: SchedulerError, completed: &DashMap<u64, TaskOutcome>) {
    for task in batch {
        publish(task, Err(err.clone()), completed);
    }
}

/// Move `task` to its terminal status and deliver `outcome` exactly once.
pub(crate) fn publish(mut task: Task, outcome: TaskOutcome, completed: &DashMap<u64, TaskOutcome>) {
    match &outcome {
        Ok(value) => {
            task.status = TaskStatus::Done;
            task.result = Some(value.clone());
        }
        Err(_) => task.status = TaskStatus::Error,
    }
    match task.completion.take() {
        // The receiver may already be gone; that caller stopped waiting.
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => {
            completed.insert(task.id, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct FailingSource;

    #[async_trait]
    impl BatchSource for FailingSource {
        async fn fetch(&self, _keys: &[u64]) -> Result<Vec<String>, SchedulerError> {
            Err(SchedulerError::Source {
                reason: "backend unavailable".into(),
            })
        }
    }

    struct ShortSource;

    #[async_trait]
    impl BatchSource for ShortSource {
        async fn fetch(&self, keys: &[u64]) -> Result<Vec<String>, SchedulerError> {
            // Drops the last value: contract violation.
            Ok(keys[..keys.len() - 1]
                .iter()
                .map(|k| format!("ok {k}"))
                .collect())
        }
    }

    #[tokio::test]
    async fn success_publishes_in_batch_order() {
        let completed = DashMap::new();
        let (t1, rx1) = Task::with_channel(1, 7);
        let (t2, rx2) = Task::with_channel(2, 2);
        let source = crate::source::SimulatedSource::new(std::time::Duration::ZERO);

        dispatch_batch(&source, &completed, vec![t1, t2], FlushReason::BatchFull).await;

        assert_eq!(rx1.await.unwrap().unwrap(), "ok 7");
        assert_eq!(rx2.await.unwrap().unwrap(), "ok 2");
        assert!(completed.is_empty());
    }

    #[tokio::test]
    async fn failure_fans_out_to_every_task() {
        let completed = DashMap::new();
        let (t1, rx1) = Task::with_channel(1, 7);
        let (t2, rx2) = Task::with_channel(2, 2);

        dispatch_batch(&FailingSource, &completed, vec![t1, t2], FlushReason::IdleExpired).await;

        let e1 = rx1.await.unwrap().unwrap_err();
        let e2 = rx2.await.unwrap().unwrap_err();
        assert!(matches!(e1, SchedulerError::Source { .. }));
        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn count_mismatch_errors_the_unmatched_tail() {
        let completed = DashMap::new();
        let (t1, rx1) = Task::with_channel(1, 7);
        let (t2, rx2) = Task::with_channel(2, 2);

        dispatch_batch(&ShortSource, &completed, vec![t1, t2], FlushReason::BatchFull).await;

        assert_eq!(rx1.await.unwrap().unwrap(), "ok 7");
        assert_eq!(
            rx2.await.unwrap().unwrap_err(),
            SchedulerError::ResultCountMismatch { expected: 2, got: 1 }
        );
    }

    #[tokio::test]
    async fn detached_outcome_lands_in_completed_map() {
        let completed = DashMap::new();
        let task = Task::detached(9, 9);
        let source = crate::source::SimulatedSource::new(std::time::Duration::ZERO);

        dispatch_batch(&source, &completed, vec![task], FlushReason::IdleExpired).await;

        let outcome = completed.remove(&9).map(|(_, v)| v).unwrap();
        assert_eq!(outcome.unwrap(), "ok 9");
    }

    #[tokio::test]
    async fn dropped_receiver_is_tolerated() {
        let completed = DashMap::new();
        let (t1, rx1) = Task::with_channel(1, 1);
        let (t2, rx2) = Task::with_channel(2, 2);
        drop(rx1);
        let source = crate::source::SimulatedSource::new(std::time::Duration::ZERO);

        dispatch_batch(&source, &completed, vec![t1, t2], FlushReason::BatchFull).await;

        // The surviving caller still gets its result.
        assert_eq!(rx2.await.unwrap().unwrap(), "ok 2");
    }
}
