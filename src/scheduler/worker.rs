//! Scheduler loop: the active agent driving flush evaluation and dispatch.
//!
//! Two states. IDLE parks on the shared `Notify` - no timer, no work -
//! until a submission wakes it. ACTIVE ticks at a fixed short cadence,
//! re-evaluating the flush policy each tick and awaiting any dispatch
//! inline, so at most one dispatch is in flight per instance. The loop
//! returns to IDLE within one tick of the queue draining.
//!
//! Submissions keep enqueueing while a dispatch is outstanding; they are
//! claimed by a later flush cycle.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::coalescer::Shared;
use super::dispatch::dispatch_batch;
use super::policy::FlushReason;

/// Spawn the scheduler loop. Returns a handle for shutdown.
pub(crate) fn spawn_scheduler(
    shared: Arc<Shared>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        scheduler_loop(&shared, shutdown).await;
    })
}

enum Step {
    /// Queue is empty: stop ticking.
    Idle,
    /// Tasks pending but the policy is not satisfied yet.
    Wait,
    /// Policy released a batch.
    Flush(FlushReason),
}

async fn scheduler_loop(shared: &Shared, shutdown: CancellationToken) {
    'run: loop {
        // IDLE: zero background work until the next submission. A permit
        // stored by notify_one() means a submission that raced the park is
        // never lost.
        shared.ticking.store(false, Ordering::Release);
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break 'run,
            () = shared.notify.notified() => {}
        }

        shared.ticking.store(true, Ordering::Release);
        tracing::trace!("scheduler active");
        let mut tick = tokio::time::interval(shared.config.tick_interval());
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break 'run,
                _ = tick.tick() => {}
            }

            let step = {
                let queue = shared.queue.lock();
                if queue.is_empty() {
                    Step::Idle
                } else {
                    match shared
                        .policy
                        .evaluate(queue.len(), queue.last_push(), Instant::now())
                    {
                        Some(reason) => Step::Flush(reason),
                        None => Step::Wait,
                    }
                }
            };

            match step {
                Step::Idle => {
                    tracing::trace!("queue drained; scheduler idling");
                    break;
                }
                Step::Wait => {}
                Step::Flush(reason) => {
                    let batch = {
                        let mut queue = shared.queue.lock();
                        queue.drain_up_to(shared.config.max_batch_size)
                    };
                    if !batch.is_empty() {
                        dispatch_batch(
                            shared.source.as_ref(),
                            &shared.completed,
                            batch,
                            reason,
                        )
                        .await;
                    }
                }
            }
        }
    }

    tracing::info!("scheduler loop: shutdown signal received");
    shared.fail_pending();
    shared.ticking.store(false, Ordering::Release);
}
