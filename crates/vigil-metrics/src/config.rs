//! Storage and retention configuration.
//!
//! Configuration is supplied wholesale at construction; loading or parsing
//! it from files is the embedding application's concern.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Rules bounding stored data by age and count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum age of a stored metric.
    pub max_age: Duration,
    /// Maximum number of stored metrics.
    pub max_count: usize,
    /// How often the retention sweeper runs.
    pub cleanup_interval: Duration,
}

impl RetentionPolicy {
    /// Checks the policy invariants: all three bounds strictly positive.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfiguration` on violation.
    pub fn validate(&self) -> Result<()> {
        if self.max_age.is_zero() {
            return Err(StoreError::InvalidConfiguration {
                reason: "retention max_age must be positive".to_string(),
            });
        }
        if self.max_count == 0 {
            return Err(StoreError::InvalidConfiguration {
                reason: "retention max_count must be positive".to_string(),
            });
        }
        if self.cleanup_interval.is_zero() {
            return Err(StoreError::InvalidConfiguration {
                reason: "retention cleanup_interval must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(24 * 60 * 60),
            max_count: 100_000,
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Which storage backend a store should bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-memory only.
    #[default]
    Memory,
    /// Remote sink only.
    External,
    /// Memory with a best-effort external mirror.
    Hybrid,
}

impl BackendKind {
    /// Whether this kind needs an external endpoint configured.
    #[must_use]
    pub const fn needs_external_url(self) -> bool {
        matches!(self, Self::External | Self::Hybrid)
    }
}

/// Configuration for a [`crate::store::MetricStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfiguration {
    /// Capacity of the in-memory buffer.
    pub max_metrics: usize,
    /// Retention bounds enforced by cleanup.
    pub retention: RetentionPolicy,
    /// Which backend to bind.
    pub backend: BackendKind,
    /// Whether the in-memory side uses a fixed-capacity ring buffer.
    /// When false the memory buffer grows unbounded and only retention
    /// cleanup trims it.
    pub enable_ring_buffer: bool,
    /// Endpoint for the external sink, required by external/hybrid kinds.
    pub external_url: Option<String>,
    /// Connection timeout for the external sink.
    pub connection_timeout: Option<Duration>,
}

impl StorageConfiguration {
    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfiguration` on violation.
    pub fn validate(&self) -> Result<()> {
        if self.max_metrics == 0 {
            return Err(StoreError::InvalidConfiguration {
                reason: "max_metrics must be positive".to_string(),
            });
        }
        self.retention.validate()?;
        if self.backend.needs_external_url() && self.external_url.is_none() {
            return Err(StoreError::InvalidConfiguration {
                reason: format!("backend {:?} requires external_url", self.backend),
            });
        }
        Ok(())
    }
}

impl Default for StorageConfiguration {
    fn default() -> Self {
        Self {
            max_metrics: 10_000,
            retention: RetentionPolicy::default(),
            backend: BackendKind::Memory,
            enable_ring_buffer: true,
            external_url: None,
            connection_timeout: None,
        }
    }
}
