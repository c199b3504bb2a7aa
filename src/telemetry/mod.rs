//! Telemetry for the coalescing scheduler.
//!
//! Structured logging via `tracing` and a `metrics` facade. No recorder is
//! installed here; exporting is the embedding application's concern.

mod logging;
mod metrics;

pub use self::logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    record_dispatch_failure, record_flush, record_queue_depth, record_stale_drop,
    record_submission,
};
