//! Core types for the metric pipeline.
//!
//! This module provides the fundamental types used throughout the vigil crates:
//! - [`Metric`]: A single metric record with value, labels, and timestamp
//! - [`MetricName`]: A validated metric name
//! - [`MetricValue`]: The tagged union of supported value shapes
//! - [`TimeRange`]: An inclusive time range for queries

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// A validated metric name.
///
/// Metric names (and label/metadata keys) must:
/// - Be non-empty
/// - Contain only ASCII alphanumeric characters, `.`, `_`, and `-`
/// - Be at most 256 characters long
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricName(String);

impl MetricName {
    /// Maximum allowed length for a metric name or key.
    pub const MAX_LENGTH: usize = 256;

    /// Creates a new validated metric name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidName` if the name violates the grammar.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::check(&name).map_err(|reason| StoreError::InvalidName { reason })?;
        Ok(Self(name))
    }

    /// Validates a label or metadata key against the same grammar as names.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidKey` if the key violates the grammar.
    pub fn validate_key(key: &str) -> Result<()> {
        Self::check(key).map_err(|reason| StoreError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    }

    fn check(name: &str) -> std::result::Result<(), String> {
        if name.is_empty() {
            return Err("cannot be empty".to_string());
        }
        if name.len() > Self::MAX_LENGTH {
            return Err(format!(
                "exceeds maximum length of {} characters",
                Self::MAX_LENGTH
            ));
        }
        for c in name.chars() {
            if !c.is_ascii_alphanumeric() && c != '.' && c != '_' && c != '-' {
                return Err(format!("invalid character '{c}'"));
            }
        }
        Ok(())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `MetricName` and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Monotonically increasing count.
    Counter,
    /// Point-in-time measurement that can go up or down.
    Gauge,
    /// Bucketed frequency distribution.
    Histogram,
    /// Raw sample set with precomputed percentiles.
    Distribution,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Distribution => "distribution",
        };
        write!(f, "{s}")
    }
}

/// Bucketed histogram data.
///
/// `counts[i]` is the number of samples that fell into the bucket bounded
/// above by `boundaries[i]`; the two vectors always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBuckets {
    /// Upper bucket boundaries, ascending.
    pub boundaries: Vec<f64>,
    /// Per-bucket sample counts, parallel to `boundaries`.
    pub counts: Vec<u64>,
    /// Sum of all observed values.
    pub sum: f64,
    /// Total number of observations.
    pub count: u64,
}

impl HistogramBuckets {
    /// Creates validated histogram buckets.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidHistogram` when `counts` and `boundaries`
    /// have different lengths.
    pub fn new(boundaries: Vec<f64>, counts: Vec<u64>, sum: f64, count: u64) -> Result<Self> {
        if boundaries.len() != counts.len() {
            return Err(StoreError::InvalidHistogram {
                reason: format!(
                    "counts length {} does not match boundaries length {}",
                    counts.len(),
                    boundaries.len()
                ),
            });
        }
        Ok(Self {
            boundaries,
            counts,
            sum,
            count,
        })
    }
}

/// The value carried by a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricValue {
    /// A plain numeric value.
    Number {
        /// The measured value.
        value: f64,
    },
    /// A numeric value with an attached unit (e.g. "ms", "bytes").
    NumberWithUnit {
        /// The measured value.
        value: f64,
        /// The unit of measurement.
        unit: String,
    },
    /// A bucketed histogram.
    Histogram {
        /// The bucket data.
        buckets: HistogramBuckets,
        /// Number of raw samples the buckets were built from.
        samples: u64,
    },
    /// A raw sample distribution with precomputed percentiles.
    Distribution {
        /// The raw sample values.
        values: Vec<f64>,
        /// Precomputed percentiles, keyed by percentile label (e.g. "p99").
        percentiles: HashMap<String, f64>,
    },
}

impl MetricValue {
    /// Returns the scalar used for numeric comparisons.
    ///
    /// Number and `NumberWithUnit` use their value, histograms use the bucket
    /// sum, and distributions use the arithmetic mean of their samples.
    /// Returns `None` for an empty distribution.
    #[must_use]
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            Self::Number { value } | Self::NumberWithUnit { value, .. } => Some(*value),
            Self::Histogram { buckets, .. } => Some(buckets.sum),
            Self::Distribution { values, .. } => {
                if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                }
            }
        }
    }
}

/// A single metric record.
///
/// Metrics are immutable once constructed: the pipeline never mutates a
/// stored metric in place, all transforms produce new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Unique id for this record.
    pub id: Uuid,
    /// The validated metric name.
    pub name: MetricName,
    /// The metric kind.
    pub kind: MetricKind,
    /// The carried value.
    pub value: MetricValue,
    /// Dimensional labels; keys follow the name grammar.
    pub labels: HashMap<String, String>,
    /// Record timestamp.
    pub timestamp: DateTime<Utc>,
    /// Free-form metadata; keys follow the name grammar.
    pub metadata: HashMap<String, String>,
    /// Originating subsystem, when known.
    pub source: Option<String>,
    /// Correlation id linking this record to a request or batch.
    pub correlation_id: Option<String>,
}

impl Metric {
    /// Creates a new metric with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(name: MetricName, kind: MetricKind, value: MetricValue) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            value,
            labels: HashMap::new(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
            source: None,
            correlation_id: None,
        }
    }

    /// Convenience constructor for a plain gauge.
    ///
    /// # Errors
    ///
    /// Returns an error when the name violates the grammar.
    pub fn gauge(name: impl Into<String>, value: f64) -> Result<Self> {
        Ok(Self::new(
            MetricName::new(name)?,
            MetricKind::Gauge,
            MetricValue::Number { value },
        ))
    }

    /// Convenience constructor for a plain counter.
    ///
    /// # Errors
    ///
    /// Returns an error when the name violates the grammar.
    pub fn counter(name: impl Into<String>, value: f64) -> Result<Self> {
        Ok(Self::new(
            MetricName::new(name)?,
            MetricKind::Counter,
            MetricValue::Number { value },
        ))
    }

    /// Adds a label, validating the key, and returns self for chaining.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidKey` for keys outside the name grammar.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key = key.into();
        MetricName::validate_key(&key)?;
        self.labels.insert(key, value.into());
        Ok(self)
    }

    /// Adds a metadata entry, validating the key, and returns self for chaining.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidKey` for keys outside the name grammar.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key = key.into();
        MetricName::validate_key(&key)?;
        self.metadata.insert(key, value.into());
        Ok(self)
    }

    /// Sets the originating source and returns self for chaining.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the correlation id and returns self for chaining.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Overrides the record timestamp and returns self for chaining.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// An inclusive time range for metric queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub start: DateTime<Utc>,
    /// End of the range (inclusive).
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new time range.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidTimeRange` if start > end.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(StoreError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a time range covering the last N minutes from now.
    #[must_use]
    pub fn last_minutes(minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            start: now - chrono::Duration::minutes(minutes),
            end: now,
        }
    }

    /// Creates a time range covering the last N hours from now.
    #[must_use]
    pub fn last_hours(hours: i64) -> Self {
        Self::last_minutes(hours * 60)
    }

    /// Checks if a timestamp falls within this range (inclusive both ends).
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}
