//! The storage backend abstraction.
//!
//! This module provides the [`StorageBackend`] trait for abstracting over
//! different metric storage implementations (in-memory, external, hybrid).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::MetricFilter;
use crate::types::{Metric, MetricValue};

/// A derived snapshot of a backend's contents.
///
/// Stats are recomputed on demand and are never authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Number of metrics currently stored.
    pub total_metrics: usize,
    /// Rough estimate of the memory held by stored metrics, in bytes.
    pub approximate_bytes: usize,
    /// Timestamp of the oldest stored metric.
    pub oldest: Option<DateTime<Utc>>,
    /// Timestamp of the newest stored metric.
    pub newest: Option<DateTime<Utc>>,
    /// Label of the backend that produced this snapshot.
    pub backend: String,
}

impl StorageStats {
    /// An empty snapshot for the given backend label.
    #[must_use]
    pub fn empty(backend: &str) -> Self {
        Self {
            total_metrics: 0,
            approximate_bytes: 0,
            oldest: None,
            newest: None,
            backend: backend.to_string(),
        }
    }
}

/// Trait for metric storage backends.
///
/// Implementors provide bulk store, filtered retrieve, retention cleanup,
/// and stats operations. Code above this trait works with any backend
/// interchangeably.
pub trait StorageBackend: Send + Sync {
    /// Stores a batch of metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot accept the batch.
    fn store(&self, metrics: Vec<Metric>) -> Result<()>;

    /// Retrieves metrics matching the filter, sorted and sliced per the
    /// filter's sort/offset/limit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn retrieve(&self, filter: &MetricFilter) -> Result<Vec<Metric>>;

    /// Removes metrics older than `cutoff`, then trims the oldest excess
    /// above `max_count`. Returns the total number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup cannot complete.
    fn cleanup(&self, cutoff: DateTime<Utc>, max_count: usize) -> Result<usize>;

    /// Returns a stats snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn stats(&self) -> Result<StorageStats>;

    /// A short label identifying the backend implementation.
    fn label(&self) -> &'static str;
}

/// Estimates the heap footprint of one metric.
///
/// Struct size plus owned string and vector payloads; close enough for
/// capacity planning, not an allocator-exact figure.
#[must_use]
pub fn approximate_metric_bytes(metric: &Metric) -> usize {
    let mut bytes = std::mem::size_of::<Metric>();
    bytes += metric.name.as_str().len();
    for (k, v) in &metric.labels {
        bytes += k.len() + v.len();
    }
    for (k, v) in &metric.metadata {
        bytes += k.len() + v.len();
    }
    bytes += metric.source.as_ref().map_or(0, String::len);
    bytes += metric.correlation_id.as_ref().map_or(0, String::len);
    bytes += match &metric.value {
        MetricValue::Number { .. } => 0,
        MetricValue::NumberWithUnit { unit, .. } => unit.len(),
        MetricValue::Histogram { buckets, .. } => {
            buckets.boundaries.len() * std::mem::size_of::<f64>()
                + buckets.counts.len() * std::mem::size_of::<u64>()
        }
        MetricValue::Distribution {
            values,
            percentiles,
        } => {
            values.len() * std::mem::size_of::<f64>()
                + percentiles
                    .iter()
                    .map(|(k, _)| k.len() + std::mem::size_of::<f64>())
                    .sum::<usize>()
        }
    };
    bytes
}

/// Computes a stats snapshot from a materialized slice of metrics.
#[must_use]
pub fn stats_of(metrics: &[Metric], backend: &str) -> StorageStats {
    StorageStats {
        total_metrics: metrics.len(),
        approximate_bytes: metrics.iter().map(approximate_metric_bytes).sum(),
        oldest: metrics.iter().map(|m| m.timestamp).min(),
        newest: metrics.iter().map(|m| m.timestamp).max(),
        backend: backend.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;
    use chrono::Duration;

    #[test]
    fn empty_stats_snapshot() {
        let stats = StorageStats::empty("memory");
        assert_eq!(stats.total_metrics, 0);
        assert_eq!(stats.oldest, None);
        assert_eq!(stats.backend, "memory");
    }

    #[test]
    fn stats_of_tracks_extremes() {
        let now = Utc::now();
        let old = Metric::gauge("a", 1.0).unwrap().at(now - Duration::hours(1));
        let new = Metric::gauge("b", 2.0).unwrap().at(now);

        let stats = stats_of(&[old, new], "memory");
        assert_eq!(stats.total_metrics, 2);
        assert_eq!(stats.oldest, Some(now - Duration::hours(1)));
        assert_eq!(stats.newest, Some(now));
        assert!(stats.approximate_bytes > 0);
    }

    #[test]
    fn byte_estimate_grows_with_payload() {
        let bare = Metric::gauge("m", 1.0).unwrap();
        let labeled = Metric::gauge("m", 1.0)
            .unwrap()
            .label("region", "eu-central-1")
            .unwrap()
            .meta("host", "node-42")
            .unwrap();

        assert!(approximate_metric_bytes(&labeled) > approximate_metric_bytes(&bare));
    }
}
