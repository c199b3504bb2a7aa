//! keybatch - request coalescing scheduler.
//!
//! Accepts many concurrently issued key lookups, buffers them in a FIFO
//! queue, and dispatches them to a downstream source in time- or
//! size-bounded batches. Each caller transparently receives its own result
//! once the batch containing its request completes.
//!
//! # Design
//!
//! - **Coalescing**: small bursts flush as soon as `min_batch_trigger`
//!   tasks are pending; sparse traffic flushes after `max_idle_ms` so no
//!   caller waits indefinitely. A single dispatch claims at most
//!   `max_batch_size` tasks; the rest stay queued.
//! - **Start on demand, stop on drain**: the scheduler loop parks (no
//!   timer, no work) while the queue is empty and is woken by the next
//!   submission.
//! - **One instance per request context**: the embedding layer constructs
//!   a [`Coalescer`] per logical context and shares it among that
//!   context's callers. There is no global state.
//!
//! # Example
//!
//! ```no_run
//! use keybatch::{Coalescer, SchedulerConfig};
//!
//! # async fn demo() -> Result<(), keybatch::SchedulerError> {
//! let coalescer = Coalescer::new(SchedulerConfig::default());
//! let result = coalescer.submit(7).await?;
//! assert_eq!(result, "ok 7");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod scheduler;
pub mod source;
pub mod telemetry;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use scheduler::{
    Coalescer, FlushPolicy, FlushReason, PendingQueue, ResponseRx, ResponseTx, Task, TaskOutcome,
    TaskStatus,
};
pub use source::{BatchSource, SimulatedSource};
