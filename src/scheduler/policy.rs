//! Flush policy: when is a batch released to the dispatcher?
//!
//! Debounce/batch hybrid. Bursts flush as soon as the size trigger is
//! reached; sparse traffic flushes once the queue has sat idle past the
//! configured window, so no caller waits indefinitely.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::SchedulerConfig;

/// Why the policy released a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// At least `min_batch_trigger` tasks were pending.
    BatchFull,
    /// The idle window since the last enqueue expired.
    IdleExpired,
}

impl FlushReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BatchFull => "batch_full",
            Self::IdleExpired => "idle_expired",
        }
    }
}

/// Pure decision function over queue state.
#[derive(Debug, Clone)]
pub struct FlushPolicy {
    min_batch_trigger: usize,
    max_idle: Duration,
}

impl FlushPolicy {
    pub fn new(min_batch_trigger: usize, max_idle: Duration) -> Self {
        Self {
            min_batch_trigger,
            max_idle,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.min_batch_trigger, config.max_idle())
    }

    /// Decide whether a batch should be dispatched now.
    ///
    /// An empty queue never flushes. Otherwise: flush when the size
    /// trigger is met, or when strictly more than the idle window has
    /// elapsed since the last enqueue.
    pub fn evaluate(
        &self,
        queue_len: usize,
        last_push: Instant,
        now: Instant,
    ) -> Option<FlushReason> {
        if queue_len == 0 {
            return None;
        }
        if queue_len >= self.min_batch_trigger {
            return Some(FlushReason::BatchFull);
        }
        if now.saturating_duration_since(last_push) > self.max_idle {
            return Some(FlushReason::IdleExpired);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FlushPolicy {
        FlushPolicy::new(5, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn empty_queue_never_flushes() {
        let now = Instant::now();
        // Even with the idle window long expired.
        let stale = now - Duration::from_secs(10);
        assert_eq!(policy().evaluate(0, stale, now), None);
    }

    #[tokio::test]
    async fn size_trigger_fires_at_threshold() {
        let now = Instant::now();
        assert_eq!(policy().evaluate(4, now, now), None);
        assert_eq!(policy().evaluate(5, now, now), Some(FlushReason::BatchFull));
        assert_eq!(policy().evaluate(50, now, now), Some(FlushReason::BatchFull));
    }

    #[tokio::test]
    async fn idle_window_is_a_strict_bound() {
        let p = policy();
        let now = Instant::now();

        let at_bound = now - Duration::from_millis(100);
        assert_eq!(p.evaluate(1, at_bound, now), None);

        let past_bound = now - Duration::from_millis(101);
        assert_eq!(p.evaluate(1, past_bound, now), Some(FlushReason::IdleExpired));
    }

    #[tokio::test]
    async fn size_trigger_wins_over_idle() {
        let p = policy();
        let now = Instant::now();
        let stale = now - Duration::from_secs(1);
        assert_eq!(p.evaluate(5, stale, now), Some(FlushReason::BatchFull));
    }

    #[tokio::test]
    async fn from_config_uses_configured_values() {
        let config = SchedulerConfig {
            min_batch_trigger: 2,
            max_idle_ms: 10,
            ..SchedulerConfig::default()
        };
        let p = FlushPolicy::from_config(&config);
        let now = Instant::now();
        assert_eq!(p.evaluate(2, now, now), Some(FlushReason::BatchFull));
        let idle = now - Duration::from_millis(11);
        assert_eq!(p.evaluate(1, idle, now), Some(FlushReason::IdleExpired));
    }
}
