//! Metric recording helpers for scheduler events.
//!
//! Thin wrappers over the `metrics` facade so call sites stay one-liners
//! and metric names live in a single place.

use metrics::{counter, gauge, histogram};

/// Record a task submission. `mode` is `"push"` or `"poll"`.
pub fn record_submission(mode: &'static str) {
    counter!("keybatch_submissions_total", "mode" => mode).increment(1);
}

/// Record the pending queue depth after a mutation.
pub fn record_queue_depth(depth: usize) {
    gauge!("keybatch_queue_depth").set(depth as f64);
}

/// Record a dispatched batch and why the policy released it.
pub fn record_flush(reason: &'static str, batch_size: usize) {
    counter!("keybatch_flushes_total", "reason" => reason).increment(1);
    histogram!("keybatch_batch_size").record(batch_size as f64);
}

/// Record a downstream dispatch failure affecting a whole batch.
pub fn record_dispatch_failure(batch_size: usize) {
    counter!("keybatch_dispatch_failures_total").increment(1);
    counter!("keybatch_tasks_failed_total").increment(batch_size as u64);
}

/// Record a task found already DONE during a drain (defensive early exit).
pub fn record_stale_drop() {
    counter!("keybatch_stale_drops_total").increment(1);
}
