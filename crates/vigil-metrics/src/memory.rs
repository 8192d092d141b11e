//! In-memory storage backend.
//!
//! Wraps a single [`RingBuffer`] (or an unbounded `Vec` when ring buffering
//! is disabled) behind a read/write lock. Retrieval materializes the buffer
//! and runs the full filter pipeline over the snapshot.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::backend::{stats_of, StorageBackend, StorageStats};
use crate::error::Result;
use crate::filter::MetricFilter;
use crate::ring::RingBuffer;
use crate::types::Metric;

/// Buffer strategy for the in-memory backend.
#[derive(Debug)]
enum Buffer {
    /// Fixed capacity, overwrite-oldest.
    Ring(RingBuffer<Metric>),
    /// Grows without bound; trimmed only by retention cleanup.
    Unbounded(Vec<Metric>),
}

impl Buffer {
    fn snapshot(&self) -> Vec<Metric> {
        match self {
            Self::Ring(ring) => ring.to_vec(),
            Self::Unbounded(items) => items.clone(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Ring(ring) => ring.len(),
            Self::Unbounded(items) => items.len(),
        }
    }
}

/// Thread-safe in-memory metric storage.
#[derive(Debug)]
pub struct InMemoryBackend {
    buffer: RwLock<Buffer>,
}

impl InMemoryBackend {
    /// Creates a ring-buffered backend with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            buffer: RwLock::new(Buffer::Ring(RingBuffer::new(capacity)?)),
        })
    }

    /// Creates an unbounded backend, trimmed only by retention cleanup.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            buffer: RwLock::new(Buffer::Unbounded(Vec::new())),
        }
    }

    /// Creates a backend per the ring-buffer flag.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidCapacity` when ring buffering is enabled
    /// with a zero capacity.
    pub fn with_strategy(capacity: usize, enable_ring_buffer: bool) -> Result<Self> {
        if enable_ring_buffer {
            Self::new(capacity)
        } else {
            Ok(Self::unbounded())
        }
    }

    /// Returns the number of stored metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.read().len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for InMemoryBackend {
    fn store(&self, metrics: Vec<Metric>) -> Result<()> {
        let count = metrics.len();
        let mut buffer = self.buffer.write();
        match &mut *buffer {
            Buffer::Ring(ring) => ring.enqueue_batch(metrics),
            Buffer::Unbounded(items) => items.extend(metrics),
        }
        debug!(stored = count, total = buffer.len(), "stored metrics in memory");
        Ok(())
    }

    fn retrieve(&self, filter: &MetricFilter) -> Result<Vec<Metric>> {
        let snapshot = self.buffer.read().snapshot();
        Ok(filter.apply(snapshot))
    }

    fn cleanup(&self, cutoff: DateTime<Utc>, max_count: usize) -> Result<usize> {
        let mut buffer = self.buffer.write();

        let items = buffer.snapshot();
        let before = items.len();

        // Age pass: drop everything strictly older than the cutoff.
        let mut survivors: Vec<Metric> =
            items.into_iter().filter(|m| m.timestamp >= cutoff).collect();
        let mut removed = before - survivors.len();

        // Count pass: trim the oldest excess above max_count.
        if survivors.len() > max_count {
            let excess = survivors.len() - max_count;
            survivors.drain(..excess);
            removed += excess;
        }

        match &mut *buffer {
            Buffer::Ring(ring) => ring.replace(survivors),
            Buffer::Unbounded(items) => *items = survivors,
        }

        debug!(removed, remaining = buffer.len(), "memory cleanup complete");
        Ok(removed)
    }

    fn stats(&self) -> Result<StorageStats> {
        let snapshot = self.buffer.read().snapshot();
        Ok(stats_of(&snapshot, self.label()))
    }

    fn label(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SortDirection, SortField, SortSpec};
    use crate::types::MetricKind;
    use chrono::Duration;

    fn gauge(name: &str, value: f64) -> Metric {
        Metric::gauge(name, value).unwrap()
    }

    mod store_tests {
        use super::*;

        #[test]
        fn store_and_retrieve_all() {
            let backend = InMemoryBackend::new(10).unwrap();
            backend
                .store(vec![gauge("a", 1.0), gauge("b", 2.0)])
                .unwrap();

            let results = backend.retrieve(&MetricFilter::new()).unwrap();
            assert_eq!(results.len(), 2);
        }

        #[test]
        fn ring_capacity_drops_oldest() {
            let backend = InMemoryBackend::new(3).unwrap();
            let metrics: Vec<Metric> =
                (0..5).map(|i| gauge("m", f64::from(i))).collect();
            backend.store(metrics).unwrap();

            let results = backend.retrieve(&MetricFilter::new()).unwrap();
            assert_eq!(results.len(), 3);
            assert_eq!(results[0].value.numeric_value(), Some(2.0));
            assert_eq!(results[2].value.numeric_value(), Some(4.0));
        }

        #[test]
        fn unbounded_backend_keeps_everything() {
            let backend = InMemoryBackend::unbounded();
            let metrics: Vec<Metric> =
                (0..500).map(|i| gauge("m", f64::from(i))).collect();
            backend.store(metrics).unwrap();

            assert_eq!(backend.len(), 500);
        }

        #[test]
        fn zero_capacity_ring_rejected() {
            assert!(InMemoryBackend::new(0).is_err());
            assert!(InMemoryBackend::with_strategy(0, true).is_err());
            // The flag off ignores the capacity entirely.
            assert!(InMemoryBackend::with_strategy(0, false).is_ok());
        }
    }

    mod retrieve_tests {
        use super::*;

        #[test]
        fn filter_pipeline_applies_sort_and_limit() {
            let backend = InMemoryBackend::new(10).unwrap();
            backend
                .store(vec![gauge("a", 3.0), gauge("b", 1.0), gauge("c", 2.0)])
                .unwrap();

            let filter = MetricFilter::new()
                .with_sort(SortSpec::new(SortField::Value, SortDirection::Ascending))
                .with_limit(2);
            let results = backend.retrieve(&filter).unwrap();

            assert_eq!(results.len(), 2);
            assert_eq!(results[0].name.as_str(), "b");
            assert_eq!(results[1].name.as_str(), "c");
        }

        #[test]
        fn kind_filter_only_returns_matching_kinds() {
            let backend = InMemoryBackend::new(10).unwrap();
            backend
                .store(vec![
                    Metric::counter("hits", 10.0).unwrap(),
                    gauge("load", 0.5),
                    Metric::counter("misses", 2.0).unwrap(),
                ])
                .unwrap();

            let filter = MetricFilter::new().with_kinds(vec![MetricKind::Counter]);
            let results = backend.retrieve(&filter).unwrap();

            assert_eq!(results.len(), 2);
            assert!(results.iter().all(|m| m.kind == MetricKind::Counter));
        }
    }

    mod cleanup_tests {
        use super::*;

        #[test]
        fn age_pass_removes_old_metrics() {
            let backend = InMemoryBackend::new(100).unwrap();
            let now = Utc::now();

            let mut metrics = Vec::new();
            for i in 0..10 {
                metrics.push(gauge("old", f64::from(i)).at(now - Duration::minutes(10)));
            }
            for i in 0..10 {
                metrics.push(gauge("new", f64::from(i)).at(now));
            }
            backend.store(metrics).unwrap();

            let cutoff = now - Duration::minutes(5);
            let removed = backend.cleanup(cutoff, usize::MAX).unwrap();

            assert_eq!(removed, 10);
            assert_eq!(backend.len(), 10);
            let survivors = backend.retrieve(&MetricFilter::new()).unwrap();
            assert!(survivors.iter().all(|m| m.name.as_str() == "new"));
        }

        #[test]
        fn count_pass_trims_oldest_excess() {
            let backend = InMemoryBackend::new(100).unwrap();
            let metrics: Vec<Metric> =
                (0..80).map(|i| gauge("m", f64::from(i))).collect();
            backend.store(metrics).unwrap();

            let cutoff = Utc::now() - Duration::hours(1);
            let removed = backend.cleanup(cutoff, 50).unwrap();

            assert_eq!(removed, 30);
            assert_eq!(backend.len(), 50);

            // The survivors are the newest 50.
            let survivors = backend.retrieve(&MetricFilter::new()).unwrap();
            assert_eq!(survivors[0].value.numeric_value(), Some(30.0));
            assert_eq!(survivors[49].value.numeric_value(), Some(79.0));
        }

        #[test]
        fn combined_passes_report_total_removed() {
            let backend = InMemoryBackend::new(100).unwrap();
            let now = Utc::now();

            let mut metrics = Vec::new();
            for i in 0..5 {
                metrics.push(gauge("stale", f64::from(i)).at(now - Duration::hours(2)));
            }
            for i in 0..10 {
                metrics.push(gauge("live", f64::from(i)).at(now));
            }
            backend.store(metrics).unwrap();

            // Age pass drops 5, count pass drops 4 more.
            let removed = backend.cleanup(now - Duration::hours(1), 6).unwrap();
            assert_eq!(removed, 9);
            assert_eq!(backend.len(), 6);
        }

        #[test]
        fn max_count_zero_drops_everything() {
            let backend = InMemoryBackend::new(10).unwrap();
            backend.store(vec![gauge("a", 1.0), gauge("b", 2.0)]).unwrap();

            let removed = backend
                .cleanup(Utc::now() - Duration::hours(1), 0)
                .unwrap();
            assert_eq!(removed, 2);
            assert!(backend.is_empty());
        }
    }

    mod stats_tests {
        use super::*;

        #[test]
        fn stats_reflect_contents() {
            let backend = InMemoryBackend::new(10).unwrap();
            let now = Utc::now();
            backend
                .store(vec![
                    gauge("a", 1.0).at(now - Duration::minutes(5)),
                    gauge("b", 2.0).at(now),
                ])
                .unwrap();

            let stats = backend.stats().unwrap();
            assert_eq!(stats.total_metrics, 2);
            assert_eq!(stats.oldest, Some(now - Duration::minutes(5)));
            assert_eq!(stats.newest, Some(now));
            assert_eq!(stats.backend, "memory");
            assert!(stats.approximate_bytes > 0);
        }

        #[test]
        fn empty_backend_stats() {
            let backend = InMemoryBackend::new(10).unwrap();
            let stats = backend.stats().unwrap();
            assert_eq!(stats.total_metrics, 0);
            assert_eq!(stats.oldest, None);
            assert_eq!(stats.newest, None);
        }
    }
}
