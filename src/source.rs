//! Downstream data source abstraction.
//!
//! The dispatcher performs exactly one [`BatchSource::fetch`] per batch,
//! keyed by the batch's requested keys in submission order. The returned
//! values must line up one-to-one with the keys; a length mismatch is
//! surfaced to the affected callers as
//! [`SchedulerError::ResultCountMismatch`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SchedulerError;

/// A downstream service capable of resolving a batch of keys in one call.
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Resolve `keys` to their values, preserving order.
    async fn fetch(&self, keys: &[u64]) -> Result<Vec<String>, SchedulerError>;
}

/// Stand-in source: sleeps a fixed latency, then resolves every key to
/// `"ok <key>"`. The real downstream is out of scope for this crate.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    latency: Duration,
}

impl SimulatedSource {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

#[async_trait]
impl BatchSource for SimulatedSource {
    async fn fetch(&self, keys: &[u64]) -> Result<Vec<String>, SchedulerError> {
        tokio::time::sleep(self.latency).await;
        Ok(keys.iter().map(|key| format!("ok {key}")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_source_resolves_each_key() {
        let source = SimulatedSource::new(Duration::ZERO);
        let values = source.fetch(&[7, 2, 9]).await.unwrap();
        assert_eq!(values, vec!["ok 7", "ok 2", "ok 9"]);
    }

    #[tokio::test]
    async fn simulated_source_empty_batch() {
        let source = SimulatedSource::new(Duration::ZERO);
        let values = source.fetch(&[]).await.unwrap();
        assert!(values.is_empty());
    }
}
