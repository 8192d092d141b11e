//! The metric store façade.
//!
//! [`MetricStore`] is the API surface the rest of the system calls: a thin,
//! stateless layer binding a [`StorageBackend`] to a
//! [`StorageConfiguration`]. It owns no metric state of its own; everything
//! forwards to the backend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::backend::{StorageBackend, StorageStats};
use crate::config::{BackendKind, StorageConfiguration};
use crate::error::{Result, StoreError};
use crate::external::ExternalBackend;
use crate::filter::MetricFilter;
use crate::hybrid::HybridBackend;
use crate::memory::InMemoryBackend;
use crate::types::{Metric, MetricName, TimeRange};

/// Orchestration layer binding a backend to its configuration.
#[derive(Clone)]
pub struct MetricStore {
    backend: Arc<dyn StorageBackend>,
    config: StorageConfiguration,
}

impl std::fmt::Debug for MetricStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricStore")
            .field("backend", &self.backend.label())
            .field("config", &self.config)
            .finish()
    }
}

impl MetricStore {
    /// Creates a store, building the backend named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn new(config: StorageConfiguration) -> Result<Self> {
        config.validate()?;

        let backend: Arc<dyn StorageBackend> = match config.backend {
            BackendKind::Memory => Arc::new(InMemoryBackend::with_strategy(
                config.max_metrics,
                config.enable_ring_buffer,
            )?),
            BackendKind::External => {
                let url = Self::required_url(&config)?;
                Arc::new(ExternalBackend::new(url, config.connection_timeout))
            }
            BackendKind::Hybrid => {
                let url = Self::required_url(&config)?;
                Arc::new(HybridBackend::new(
                    Arc::new(InMemoryBackend::with_strategy(
                        config.max_metrics,
                        config.enable_ring_buffer,
                    )?),
                    Arc::new(ExternalBackend::new(url, config.connection_timeout)),
                ))
            }
        };

        Ok(Self { backend, config })
    }

    /// Creates a store around an injected backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn with_backend(
        config: StorageConfiguration,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        config.retention.validate()?;
        Ok(Self { backend, config })
    }

    fn required_url(config: &StorageConfiguration) -> Result<String> {
        config
            .external_url
            .clone()
            .ok_or_else(|| StoreError::InvalidConfiguration {
                reason: format!("backend {:?} requires external_url", config.backend),
            })
    }

    /// The bound configuration.
    #[must_use]
    pub const fn config(&self) -> &StorageConfiguration {
        &self.config
    }

    /// Records a single metric.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the write.
    pub fn record_one(&self, metric: Metric) -> Result<()> {
        self.backend.store(vec![metric])
    }

    /// Records a batch of metrics in one backend write.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the write.
    pub fn record_many(&self, metrics: Vec<Metric>) -> Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }
        self.backend.store(metrics)
    }

    /// Queries metrics through the backend's filter pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    pub fn query(&self, filter: &MetricFilter) -> Result<Vec<Metric>> {
        self.backend.retrieve(filter)
    }

    /// Queries all metrics with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    pub fn query_by_name(&self, name: &MetricName) -> Result<Vec<Metric>> {
        let filter = MetricFilter::new().with_names(vec![name.clone()]);
        self.backend.retrieve(&filter)
    }

    /// Queries all metrics within the inclusive time range.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    pub fn query_by_time_range(&self, range: TimeRange) -> Result<Vec<Metric>> {
        let filter = MetricFilter::new().with_time_range(range);
        self.backend.retrieve(&filter)
    }

    /// Enforces the retention policy: evicts metrics older than
    /// `now - max_age`, then trims to `max_count`. Returns the number
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cleanup fails.
    pub fn cleanup(&self) -> Result<usize> {
        self.cleanup_with(&self.config.retention)
    }

    /// Enforces an explicit retention policy instead of the configured one.
    /// Lets a sweeper apply a hot-reloaded policy without rebuilding the
    /// store. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cleanup fails.
    pub fn cleanup_with(&self, retention: &crate::config::RetentionPolicy) -> Result<usize> {
        let max_age = chrono::Duration::from_std(retention.max_age).map_err(|_| {
            StoreError::InvalidConfiguration {
                reason: "retention max_age out of range".to_string(),
            }
        })?;
        let cutoff = Utc::now() - max_age;
        let removed = self.backend.cleanup(cutoff, retention.max_count)?;
        debug!(removed, backend = self.backend.label(), "retention cleanup");
        Ok(removed)
    }

    /// Removes every stored metric. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cleanup fails.
    pub fn clear(&self) -> Result<usize> {
        // A cutoff in the far future makes the age pass always true; a zero
        // count bound drops whatever survives it.
        self.backend.cleanup(DateTime::<Utc>::MAX_UTC, 0)
    }

    /// Returns a stats snapshot from the backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    pub fn stats(&self) -> Result<StorageStats> {
        self.backend.stats()
    }
}
