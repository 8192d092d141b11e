//! Hybrid storage backend.
//!
//! Composes an [`InMemoryBackend`] and an [`ExternalBackend`]: writes land
//! in memory synchronously and are mirrored to the external sink on a
//! detached task (fire-and-forget — mirror failures are logged, never
//! propagated, and never block the caller). Reads prefer memory and only
//! fall through to the external side when memory comes back empty.
//!
//! The mirror write requires a running tokio runtime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::backend::{StorageBackend, StorageStats};
use crate::error::Result;
use crate::external::ExternalBackend;
use crate::filter::MetricFilter;
use crate::memory::InMemoryBackend;
use crate::types::Metric;

/// Backend writing to memory and mirroring to an external sink.
#[derive(Debug)]
pub struct HybridBackend {
    memory: Arc<InMemoryBackend>,
    external: Arc<ExternalBackend>,
}

impl HybridBackend {
    /// Creates a hybrid backend from its two sides.
    #[must_use]
    pub fn new(memory: Arc<InMemoryBackend>, external: Arc<ExternalBackend>) -> Self {
        Self { memory, external }
    }

    /// The in-memory side.
    #[must_use]
    pub fn memory(&self) -> &Arc<InMemoryBackend> {
        &self.memory
    }

    /// The external side.
    #[must_use]
    pub fn external(&self) -> &Arc<ExternalBackend> {
        &self.external
    }
}

impl StorageBackend for HybridBackend {
    fn store(&self, metrics: Vec<Metric>) -> Result<()> {
        self.memory.store(metrics.clone())?;

        let external = Arc::clone(&self.external);
        tokio::spawn(async move {
            if let Err(err) = external.store(metrics) {
                warn!(error = %err, "external mirror write failed");
            }
        });

        Ok(())
    }

    fn retrieve(&self, filter: &MetricFilter) -> Result<Vec<Metric>> {
        let from_memory = self.memory.retrieve(filter)?;
        if !from_memory.is_empty() {
            return Ok(from_memory);
        }
        debug!("memory returned no results, falling back to external");
        self.external.retrieve(filter)
    }

    fn cleanup(&self, cutoff: DateTime<Utc>, max_count: usize) -> Result<usize> {
        let removed_memory = self.memory.cleanup(cutoff, max_count)?;
        let removed_external = self.external.cleanup(cutoff, max_count)?;
        Ok(removed_memory + removed_external)
    }

    fn stats(&self) -> Result<StorageStats> {
        let memory = self.memory.stats()?;
        let external = self.external.stats()?;

        let oldest = match (memory.oldest, external.oldest) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let newest = match (memory.newest, external.newest) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        Ok(StorageStats {
            total_metrics: memory.total_metrics + external.total_metrics,
            approximate_bytes: memory.approximate_bytes + external.approximate_bytes,
            oldest,
            newest,
            backend: self.label().to_string(),
        })
    }

    fn label(&self) -> &'static str {
        "hybrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::external::RemoteSink;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn gauge(name: &str, value: f64) -> Metric {
        Metric::gauge(name, value).unwrap()
    }

    fn hybrid() -> HybridBackend {
        HybridBackend::new(
            Arc::new(InMemoryBackend::new(100).unwrap()),
            Arc::new(ExternalBackend::new("http://metrics.internal:9009", None)),
        )
    }

    /// Waits for the detached mirror write to land.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn store_writes_memory_synchronously() {
        let backend = hybrid();
        backend.store(vec![gauge("a", 1.0)]).unwrap();

        // Memory sees the write immediately, before the mirror settles.
        assert_eq!(backend.memory().len(), 1);
    }

    #[tokio::test]
    async fn mirror_write_reaches_external_side() {
        let backend = hybrid();
        backend.store(vec![gauge("a", 1.0), gauge("b", 2.0)]).unwrap();
        settle().await;

        let stats = backend.external().stats().unwrap();
        assert_eq!(stats.total_metrics, 2);
    }

    #[tokio::test]
    async fn mirror_failure_never_propagates() {
        struct RejectingSink;
        impl RemoteSink for RejectingSink {
            fn send(&self, _metrics: &[Metric]) -> crate::error::Result<()> {
                Err(StoreError::Backend {
                    operation: "send",
                    reason: "remote down".to_string(),
                    source: None,
                })
            }
            fn fetch(&self, _filter: &MetricFilter) -> crate::error::Result<Vec<Metric>> {
                Ok(Vec::new())
            }
            fn prune(
                &self,
                _cutoff: DateTime<Utc>,
                _max_count: usize,
            ) -> crate::error::Result<usize> {
                Ok(0)
            }
            fn remote_stats(&self) -> crate::error::Result<StorageStats> {
                Ok(StorageStats::empty("external"))
            }
        }

        let backend = HybridBackend::new(
            Arc::new(InMemoryBackend::new(100).unwrap()),
            Arc::new(ExternalBackend::with_sink(
                "http://down.internal:9009",
                None,
                Arc::new(RejectingSink),
            )),
        );

        // The caller still succeeds and memory still has the data.
        backend.store(vec![gauge("a", 1.0)]).unwrap();
        settle().await;
        assert_eq!(backend.memory().len(), 1);
    }

    #[tokio::test]
    async fn retrieve_prefers_memory() {
        let backend = hybrid();
        backend.store(vec![gauge("a", 1.0)]).unwrap();
        settle().await;

        let results = backend.retrieve(&MetricFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn retrieve_falls_back_to_external_when_memory_empty() {
        /// A sink pre-seeded with data the memory side never saw.
        #[derive(Default)]
        struct SeededSink {
            held: Mutex<Vec<Metric>>,
        }
        impl RemoteSink for SeededSink {
            fn send(&self, metrics: &[Metric]) -> crate::error::Result<()> {
                self.held.lock().extend_from_slice(metrics);
                Ok(())
            }
            fn fetch(&self, filter: &MetricFilter) -> crate::error::Result<Vec<Metric>> {
                Ok(filter.apply(self.held.lock().clone()))
            }
            fn prune(
                &self,
                _cutoff: DateTime<Utc>,
                _max_count: usize,
            ) -> crate::error::Result<usize> {
                Ok(0)
            }
            fn remote_stats(&self) -> crate::error::Result<StorageStats> {
                Ok(StorageStats::empty("external"))
            }
        }

        let sink = Arc::new(SeededSink::default());
        sink.send(&[gauge("archived", 7.0)]).unwrap();

        let backend = HybridBackend::new(
            Arc::new(InMemoryBackend::new(100).unwrap()),
            Arc::new(ExternalBackend::with_sink(
                "http://metrics.internal:9009",
                None,
                sink,
            )),
        );

        let results = backend.retrieve(&MetricFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name.as_str(), "archived");
    }

    #[tokio::test]
    async fn cleanup_sums_both_sides() {
        let backend = hybrid();
        let now = Utc::now();
        backend
            .store(vec![
                gauge("old", 1.0).at(now - chrono::Duration::hours(2)),
                gauge("new", 2.0).at(now),
            ])
            .unwrap();
        settle().await;

        // Both sides drop the old metric: one removal each.
        let removed = backend
            .cleanup(now - chrono::Duration::hours(1), usize::MAX)
            .unwrap();
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn stats_aggregate_both_sides() {
        let backend = hybrid();
        let now = Utc::now();
        backend
            .store(vec![
                gauge("a", 1.0).at(now - chrono::Duration::minutes(10)),
                gauge("b", 2.0).at(now),
            ])
            .unwrap();
        settle().await;

        let stats = backend.stats().unwrap();
        // Two metrics held on each side.
        assert_eq!(stats.total_metrics, 4);
        assert_eq!(stats.oldest, Some(now - chrono::Duration::minutes(10)));
        assert_eq!(stats.newest, Some(now));
        assert_eq!(stats.backend, "hybrid");
    }
}
