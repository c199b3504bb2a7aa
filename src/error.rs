//! Scheduler error types.
//!
//! Errors are cloneable so a single downstream failure can fan out to
//! every task in the affected batch. Failures stay local to their batch:
//! the scheduler loop itself never dies on a dispatch error.

use thiserror::Error;

/// Errors surfaced to callers of the coalescing scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("downstream fetch failed: {reason}")]
    Source { reason: String },

    #[error("downstream returned {got} results for {expected} keys")]
    ResultCountMismatch { expected: usize, got: usize },

    #[error("completion channel closed before a result was delivered")]
    CompletionDropped,

    #[error("scheduler is shutting down")]
    ShuttingDown,
}

impl SchedulerError {
    /// Returns true if this error originated downstream rather than in
    /// the scheduler itself.
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Self::Source { .. } | Self::ResultCountMismatch { .. })
    }
}
