//! Scheduler configuration loading from environment variables.
//!
//! All values are loaded from `KEYBATCH_*` environment variables with
//! sensible defaults. Invalid values fall back to defaults without
//! crashing; zero values are floored to the smallest sane setting.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `KEYBATCH_MIN_BATCH_TRIGGER` | 5 | Flush once this many tasks are pending |
//! | `KEYBATCH_MAX_IDLE_MS` | 100 | Flush once this long has passed since the last enqueue |
//! | `KEYBATCH_MAX_BATCH_SIZE` | 100 | Max tasks claimed by a single dispatch |
//! | `KEYBATCH_TICK_INTERVAL_MS` | 1 | Scheduler loop tick period while active |
//! | `KEYBATCH_POLL_INTERVAL_MS` | 250 | Sleep between poll-mode result checks |
//! | `KEYBATCH_SOURCE_LATENCY_MS` | 50 | Simulated downstream latency |

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`Coalescer`](crate::Coalescer) instance.
///
/// Durations are millisecond fields so the struct stays trivially
/// serializable inside a host's own config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Flush as soon as at least this many tasks are pending.
    pub min_batch_trigger: usize,
    /// Flush once this much time has elapsed since the last enqueue,
    /// regardless of count.
    pub max_idle_ms: u64,
    /// Cap on how many tasks a single dispatch may claim. Excess tasks
    /// remain queued for the next cycle.
    pub max_batch_size: usize,
    /// Tick period of the scheduler loop while the queue is non-empty.
    pub tick_interval_ms: u64,
    /// Sleep between completed-result checks in poll mode.
    pub poll_interval_ms: u64,
    /// Fixed latency of the simulated downstream source.
    pub source_latency_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_batch_trigger: 5,
            max_idle_ms: 100,
            max_batch_size: 100,
            tick_interval_ms: 1,
            poll_interval_ms: 250,
            source_latency_ms: 50,
        }
    }
}

impl SchedulerConfig {
    pub fn max_idle(&self) -> Duration {
        Duration::from_millis(self.max_idle_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn source_latency(&self) -> Duration {
        Duration::from_millis(self.source_latency_ms)
    }
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Load scheduler configuration from environment variables.
///
/// Missing or invalid values fall back to defaults without panicking.
pub fn load() -> SchedulerConfig {
    let defaults = SchedulerConfig::default();

    let min_batch_trigger =
        parse_usize("KEYBATCH_MIN_BATCH_TRIGGER", defaults.min_batch_trigger).max(1);
    let max_idle_ms = parse_u64("KEYBATCH_MAX_IDLE_MS", defaults.max_idle_ms).max(1);
    let max_batch_size = parse_usize("KEYBATCH_MAX_BATCH_SIZE", defaults.max_batch_size).max(1);
    let tick_interval_ms =
        parse_u64("KEYBATCH_TICK_INTERVAL_MS", defaults.tick_interval_ms).max(1);
    let poll_interval_ms =
        parse_u64("KEYBATCH_POLL_INTERVAL_MS", defaults.poll_interval_ms).max(1);
    // 0 is allowed: an instantaneous stand-in source is useful in tests.
    let source_latency_ms = parse_u64("KEYBATCH_SOURCE_LATENCY_MS", defaults.source_latency_ms);

    SchedulerConfig {
        min_batch_trigger,
        max_idle_ms,
        max_batch_size,
        tick_interval_ms,
        poll_interval_ms,
        source_latency_ms,
    }
}
