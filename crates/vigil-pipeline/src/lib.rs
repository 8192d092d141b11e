//! Batching and retention on top of `vigil-metrics`.
#![forbid(unsafe_code)]
//!
//! `vigil-pipeline` adds the operational half of the vigil pipeline: a
//! [`BatchProcessor`] that queues incoming metrics and flushes them to a
//! [`vigil_metrics::MetricStore`] in batches, and a [`RetentionSweeper`]
//! that periodically enforces a retention policy against the same store.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vigil_metrics::{Metric, MetricStore, StorageConfiguration};
//! use vigil_pipeline::{BatchConfiguration, BatchProcessor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(MetricStore::new(StorageConfiguration::default()).unwrap());
//! let processor = Arc::new(
//!     BatchProcessor::new(store.clone(), BatchConfiguration::default()).unwrap(),
//! );
//!
//! processor.start();
//! processor.add(Metric::gauge("cpu.load", 0.7).unwrap()).unwrap();
//! processor.flush().unwrap();
//! processor.stop();
//!
//! assert_eq!(store.stats().unwrap().total_metrics, 1);
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod batch;
pub mod error;
pub mod retention;

// Re-export main types at crate root
pub use batch::{
    BatchConfiguration, BatchConfigurationUpdate, BatchItem, BatchProcessor, BatchStats,
    HealthReport, HealthState, RetryConfig,
};
pub use error::{BatchError, BatchResult, RetentionError, RetentionResult};
pub use retention::{RetentionSweeper, SweepStats};
