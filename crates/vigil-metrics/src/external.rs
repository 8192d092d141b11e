//! External storage backend.
//!
//! Models a remote metric sink behind the same [`StorageBackend`] interface.
//! The actual transport lives behind the [`RemoteSink`] trait; the shipped
//! [`InProcessSink`] is a loopback stand-in so the boundary stays testable
//! without a network.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::backend::{stats_of, StorageBackend, StorageStats};
use crate::error::{Result, StoreError};
use crate::filter::MetricFilter;
use crate::types::Metric;

/// Transport boundary for a remote metric sink.
///
/// Implementations wrap whatever wire call actually ships the metrics.
/// Failures should be returned, not swallowed; the [`ExternalBackend`]
/// wraps them with operation context.
pub trait RemoteSink: Send + Sync {
    /// Ships a batch of metrics to the remote side.
    ///
    /// # Errors
    ///
    /// Returns an error when the remote rejects or cannot be reached.
    fn send(&self, metrics: &[Metric]) -> Result<()>;

    /// Fetches metrics matching the filter from the remote side.
    ///
    /// # Errors
    ///
    /// Returns an error when the remote cannot be read.
    fn fetch(&self, filter: &MetricFilter) -> Result<Vec<Metric>>;

    /// Asks the remote side to evict by age and count; returns the number
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the remote cannot complete the eviction.
    fn prune(&self, cutoff: DateTime<Utc>, max_count: usize) -> Result<usize>;

    /// Fetches a stats snapshot from the remote side.
    ///
    /// # Errors
    ///
    /// Returns an error when the remote cannot be read.
    fn remote_stats(&self) -> Result<StorageStats>;
}

/// Loopback sink holding metrics in process.
///
/// Stands in for the real remote service in tests and single-node
/// deployments.
#[derive(Debug, Default)]
pub struct InProcessSink {
    metrics: Mutex<Vec<Metric>>,
}

impl InProcessSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of held metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.lock().len()
    }

    /// Returns true when nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RemoteSink for InProcessSink {
    fn send(&self, metrics: &[Metric]) -> Result<()> {
        self.metrics.lock().extend_from_slice(metrics);
        Ok(())
    }

    fn fetch(&self, filter: &MetricFilter) -> Result<Vec<Metric>> {
        let snapshot = self.metrics.lock().clone();
        Ok(filter.apply(snapshot))
    }

    fn prune(&self, cutoff: DateTime<Utc>, max_count: usize) -> Result<usize> {
        let mut held = self.metrics.lock();
        let before = held.len();

        let mut survivors: Vec<Metric> = held
            .drain(..)
            .filter(|m| m.timestamp >= cutoff)
            .collect();
        let mut removed = before - survivors.len();

        if survivors.len() > max_count {
            let excess = survivors.len() - max_count;
            survivors.drain(..excess);
            removed += excess;
        }

        *held = survivors;
        Ok(removed)
    }

    fn remote_stats(&self) -> Result<StorageStats> {
        let snapshot = self.metrics.lock().clone();
        Ok(stats_of(&snapshot, "external"))
    }
}

/// Storage backend that forwards to a remote sink.
pub struct ExternalBackend {
    sink: Arc<dyn RemoteSink>,
    url: String,
    connection_timeout: Duration,
}

impl std::fmt::Debug for ExternalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalBackend")
            .field("url", &self.url)
            .field("connection_timeout", &self.connection_timeout)
            .finish_non_exhaustive()
    }
}

impl ExternalBackend {
    /// Default connection timeout when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a backend against the loopback sink.
    #[must_use]
    pub fn new(url: impl Into<String>, connection_timeout: Option<Duration>) -> Self {
        Self::with_sink(url, connection_timeout, Arc::new(InProcessSink::new()))
    }

    /// Creates a backend with an injected sink.
    #[must_use]
    pub fn with_sink(
        url: impl Into<String>,
        connection_timeout: Option<Duration>,
        sink: Arc<dyn RemoteSink>,
    ) -> Self {
        Self {
            sink,
            url: url.into(),
            connection_timeout: connection_timeout.unwrap_or(Self::DEFAULT_TIMEOUT),
        }
    }

    /// The configured endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The configured connection timeout.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }
}

impl StorageBackend for ExternalBackend {
    fn store(&self, metrics: Vec<Metric>) -> Result<()> {
        let count = metrics.len();
        self.sink
            .send(&metrics)
            .map_err(|cause| StoreError::backend("store", cause))?;
        debug!(stored = count, url = %self.url, "shipped metrics to external sink");
        Ok(())
    }

    fn retrieve(&self, filter: &MetricFilter) -> Result<Vec<Metric>> {
        self.sink
            .fetch(filter)
            .map_err(|cause| StoreError::backend("retrieve", cause))
    }

    fn cleanup(&self, cutoff: DateTime<Utc>, max_count: usize) -> Result<usize> {
        self.sink
            .prune(cutoff, max_count)
            .map_err(|cause| StoreError::backend("cleanup", cause))
    }

    fn stats(&self) -> Result<StorageStats> {
        self.sink
            .remote_stats()
            .map_err(|cause| StoreError::backend("stats", cause))
    }

    fn label(&self) -> &'static str {
        "external"
    }
}
