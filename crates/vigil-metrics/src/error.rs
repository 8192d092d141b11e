//! Error types for the vigil-metrics crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur in the metric storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The metric name is invalid (empty, too long, or contains invalid characters).
    #[error("invalid metric name: {reason}")]
    InvalidName {
        /// The reason the name is invalid.
        reason: String,
    },

    /// A label or metadata key is invalid.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey {
        /// The offending key.
        key: String,
        /// The reason the key is invalid.
        reason: String,
    },

    /// The time range is invalid (start > end).
    #[error("invalid time range: start={start}, end={end}")]
    InvalidTimeRange {
        /// Start of the range.
        start: DateTime<Utc>,
        /// End of the range.
        end: DateTime<Utc>,
    },

    /// The requested ring buffer capacity is not usable.
    #[error("ring buffer capacity must be greater than zero, got {requested}")]
    InvalidCapacity {
        /// The capacity that was requested.
        requested: usize,
    },

    /// Histogram buckets violate their structural invariants.
    #[error("invalid histogram: {reason}")]
    InvalidHistogram {
        /// The reason the histogram is invalid.
        reason: String,
    },

    /// A storage or retention configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// A backend operation (store/retrieve/cleanup/stats) failed.
    #[error("storage {operation} failed: {reason}")]
    Backend {
        /// The operation that failed.
        operation: &'static str,
        /// Human-readable failure description.
        reason: String,
        /// The underlying cause, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Wraps an underlying error into a [`StoreError::Backend`] for the given operation.
    pub fn backend(
        operation: &'static str,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            operation,
            reason: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_name() {
        let err = StoreError::InvalidName {
            reason: "empty name".to_string(),
        };
        assert_eq!(err.to_string(), "invalid metric name: empty name");
    }

    #[test]
    fn error_display_invalid_key() {
        let err = StoreError::InvalidKey {
            key: "bad key".to_string(),
            reason: "contains whitespace".to_string(),
        };
        assert_eq!(err.to_string(), "invalid key 'bad key': contains whitespace");
    }

    #[test]
    fn error_display_invalid_capacity() {
        let err = StoreError::InvalidCapacity { requested: 0 };
        assert_eq!(
            err.to_string(),
            "ring buffer capacity must be greater than zero, got 0"
        );
    }

    #[test]
    fn error_display_backend_without_cause() {
        let err = StoreError::Backend {
            operation: "store",
            reason: "sink unavailable".to_string(),
            source: None,
        };
        assert_eq!(err.to_string(), "storage store failed: sink unavailable");
    }

    #[test]
    fn backend_wrapper_preserves_cause() {
        let cause = StoreError::InvalidConfiguration {
            reason: "max_metrics is zero".to_string(),
        };
        let err = StoreError::backend("cleanup", cause);

        assert!(err.to_string().contains("cleanup"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
