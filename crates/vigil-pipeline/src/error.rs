//! Error types for the vigil-pipeline crate.

use thiserror::Error;
use uuid::Uuid;
use vigil_metrics::StoreError;

/// Errors raised by the batch processor.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The processor was asked to do work while stopped.
    #[error("batch processor is not running")]
    NotRunning,

    /// The batch configuration violates its invariants.
    #[error("invalid batch configuration: {reason}")]
    InvalidConfiguration {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// A flush drained items but the storage write failed. The drained
    /// items have been re-enqueued for redelivery.
    #[error("flush failed: {reason}")]
    FlushFailed {
        /// Human-readable failure description.
        reason: String,
        /// Batch ids of the items that failed to flush.
        failed_ids: Vec<Uuid>,
        /// The underlying storage failure.
        #[source]
        source: StoreError,
    },
}

/// Result type for batch operations.
pub type BatchResult<T> = std::result::Result<T, BatchError>;

/// Errors raised by the retention sweeper.
#[derive(Debug, Error)]
pub enum RetentionError {
    /// The retention policy violates its invariants.
    #[error("invalid retention policy: {reason}")]
    InvalidPolicy {
        /// The reason the policy is invalid.
        reason: String,
    },

    /// A sweep ran but the underlying store cleanup failed.
    #[error("retention sweep failed")]
    SweepFailed {
        /// The underlying storage failure.
        #[source]
        source: StoreError,
    },
}

/// Result type for retention operations.
pub type RetentionResult<T> = std::result::Result<T, RetentionError>;
