//! Embedded metric ingestion and storage.
#![forbid(unsafe_code)]
//!
//! `vigil-metrics` provides the storage half of the vigil pipeline: a
//! validated metric data model, a fixed-capacity ring buffer with
//! overwrite-oldest semantics, and pluggable storage backends (in-memory,
//! external sink, hybrid) behind one [`MetricStore`] façade.
//!
//! # Example
//!
//! ```rust
//! use vigil_metrics::{Metric, MetricFilter, MetricKind, MetricStore, StorageConfiguration};
//!
//! let store = MetricStore::new(StorageConfiguration::default()).unwrap();
//!
//! let metric = Metric::counter("requests.total", 1.0)
//!     .unwrap()
//!     .label("region", "eu-west")
//!     .unwrap();
//! store.record_one(metric).unwrap();
//!
//! let counters = store
//!     .query(&MetricFilter::new().with_kinds(vec![MetricKind::Counter]))
//!     .unwrap();
//! assert_eq!(counters.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod external;
pub mod filter;
pub mod hybrid;
pub mod memory;
pub mod ring;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use backend::{StorageBackend, StorageStats};
pub use config::{BackendKind, RetentionPolicy, StorageConfiguration};
pub use error::{Result, StoreError};
pub use external::{ExternalBackend, InProcessSink, RemoteSink};
pub use filter::{
    FieldFilter, MetricFilter, NumberMatch, SortDirection, SortField, SortSpec, StringMatch,
    ValueFilter,
};
pub use hybrid::HybridBackend;
pub use memory::InMemoryBackend;
pub use ring::RingBuffer;
pub use store::MetricStore;
pub use types::{HistogramBuckets, Metric, MetricKind, MetricName, MetricValue, TimeRange};
