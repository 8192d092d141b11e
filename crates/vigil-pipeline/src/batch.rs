//! Queue-based batch processing of incoming metrics.
//!
//! The [`BatchProcessor`] accumulates metrics in a pending queue and flushes
//! them to a [`MetricStore`] when the queue reaches the configured batch
//! size, when the scheduled interval fires, or on demand. Failed flushes
//! re-enqueue their items for at-least-once redelivery.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vigil_metrics::{Metric, MetricStore};

use crate::error::{BatchError, BatchResult};

/// Retry policy driven by the flush scheduler.
///
/// [`BatchProcessor::flush`] itself never retries; the scheduler (or the
/// caller) applies this policy around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        }
    }
}

/// Configuration for the batch processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfiguration {
    /// Queue length that triggers an immediate flush.
    pub max_batch_size: usize,
    /// Interval of the auto-flush scheduler.
    pub flush_interval: Duration,
    /// Upper bound on how long an item may sit queued before a flush is
    /// forced. Must be at least `flush_interval`.
    pub max_wait_time: Duration,
    /// Whether to run the background flush scheduler.
    pub enable_auto_flush: bool,
    /// Whether to accumulate at all; when false every add flushes
    /// immediately.
    pub enable_batching: bool,
    /// Whether failed flushes re-enqueue their items for redelivery.
    pub enable_partial_failure_recovery: bool,
    /// Retry policy for scheduled flushes.
    pub retry: RetryConfig,
}

impl BatchConfiguration {
    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::InvalidConfiguration` on violation.
    pub fn validate(&self) -> BatchResult<()> {
        if self.max_batch_size == 0 {
            return Err(BatchError::InvalidConfiguration {
                reason: "max_batch_size must be positive".to_string(),
            });
        }
        if self.flush_interval.is_zero() {
            return Err(BatchError::InvalidConfiguration {
                reason: "flush_interval must be positive".to_string(),
            });
        }
        if self.max_wait_time < self.flush_interval {
            return Err(BatchError::InvalidConfiguration {
                reason: format!(
                    "max_wait_time {:?} must be at least flush_interval {:?}",
                    self.max_wait_time, self.flush_interval
                ),
            });
        }
        Ok(())
    }
}

impl Default for BatchConfiguration {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            flush_interval: Duration::from_secs(5),
            max_wait_time: Duration::from_secs(30),
            enable_auto_flush: true,
            enable_batching: true,
            enable_partial_failure_recovery: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Partial configuration merged over the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfigurationUpdate {
    /// New batch size threshold, when set.
    pub max_batch_size: Option<usize>,
    /// New scheduler interval, when set.
    pub flush_interval: Option<Duration>,
    /// New maximum queue wait, when set.
    pub max_wait_time: Option<Duration>,
    /// Toggle the auto-flush scheduler, when set.
    pub enable_auto_flush: Option<bool>,
    /// Toggle batching, when set.
    pub enable_batching: Option<bool>,
    /// Toggle redelivery, when set.
    pub enable_partial_failure_recovery: Option<bool>,
    /// New retry policy, when set.
    pub retry: Option<RetryConfig>,
}

impl BatchConfigurationUpdate {
    fn merge_into(self, base: &BatchConfiguration) -> BatchConfiguration {
        BatchConfiguration {
            max_batch_size: self.max_batch_size.unwrap_or(base.max_batch_size),
            flush_interval: self.flush_interval.unwrap_or(base.flush_interval),
            max_wait_time: self.max_wait_time.unwrap_or(base.max_wait_time),
            enable_auto_flush: self.enable_auto_flush.unwrap_or(base.enable_auto_flush),
            enable_batching: self.enable_batching.unwrap_or(base.enable_batching),
            enable_partial_failure_recovery: self
                .enable_partial_failure_recovery
                .unwrap_or(base.enable_partial_failure_recovery),
            retry: self.retry.unwrap_or_else(|| base.retry.clone()),
        }
    }
}

/// A metric waiting in the pending queue.
///
/// Lives only between enqueue and a successful flush; a failed flush puts
/// it back verbatim (at-least-once redelivery).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// The queued metric.
    pub metric: Metric,
    /// When the item entered the queue.
    pub added_at: DateTime<Utc>,
    /// Correlation id for this enqueue.
    pub batch_id: Uuid,
}

impl BatchItem {
    fn new(metric: Metric) -> Self {
        Self {
            metric,
            added_at: Utc::now(),
            batch_id: Uuid::new_v4(),
        }
    }
}

/// Running statistics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Batches flushed successfully.
    pub total_batches: u64,
    /// Metrics flushed successfully.
    pub total_metrics: u64,
    /// Successful flushes.
    pub successful_batches: u64,
    /// Failed flushes.
    pub failed_batches: u64,
    /// Incremental mean batch size over successful flushes.
    pub average_batch_size: f64,
    /// Incremental mean flush duration in milliseconds.
    pub average_flush_millis: f64,
    /// Items currently queued.
    pub pending: usize,
    /// Whether the processor accepts work.
    pub is_running: bool,
    /// Whether the auto-flush scheduler is active.
    pub scheduler_active: bool,
    /// Time of the last successful flush.
    pub last_flush: Option<DateTime<Utc>>,
}

/// Aggregate health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// No issues detected.
    Healthy,
    /// Issues detected but the processor is still making progress.
    Degraded,
    /// The processor needs intervention.
    Unhealthy,
}

/// Health report with human-readable findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// The aggregate classification.
    pub state: HealthState,
    /// Detected issues.
    pub issues: Vec<String>,
    /// Suggested remediations, parallel to `issues`.
    pub recommendations: Vec<String>,
}

/// Queue backlog beyond which health degrades.
const BACKLOG_THRESHOLD: usize = 1000;
/// Failure rate beyond which health degrades.
const FAILURE_RATE_THRESHOLD: f64 = 0.10;
/// A last flush older than this degrades health.
const STALE_FLUSH_AGE: chrono::Duration = chrono::Duration::minutes(5);

#[derive(Debug, Default)]
struct StatsInner {
    total_batches: u64,
    total_metrics: u64,
    successful_batches: u64,
    failed_batches: u64,
    average_batch_size: f64,
    average_flush_millis: f64,
    last_flush: Option<DateTime<Utc>>,
}

/// Accumulates metrics and flushes them to the store in batches.
pub struct BatchProcessor {
    store: Arc<MetricStore>,
    config: RwLock<BatchConfiguration>,
    queue: Mutex<VecDeque<BatchItem>>,
    /// Whether the processor accepts work.
    running: AtomicBool,
    /// Serializes drains: a size-triggered flush and a scheduled flush must
    /// never race on the same items.
    flushing: AtomicBool,
    scheduler: Mutex<Option<JoinHandle<()>>>,
    stats: Mutex<StatsInner>,
}

impl std::fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("running", &self.running.load(Ordering::SeqCst))
            .field("pending", &self.queue.lock().len())
            .finish_non_exhaustive()
    }
}

impl BatchProcessor {
    /// Creates a stopped processor bound to a store.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::InvalidConfiguration` when the configuration
    /// violates its invariants.
    pub fn new(store: Arc<MetricStore>, config: BatchConfiguration) -> BatchResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config: RwLock::new(config),
            queue: Mutex::new(VecDeque::new()),
            running: AtomicBool::new(false),
            flushing: AtomicBool::new(false),
            scheduler: Mutex::new(None),
            stats: Mutex::new(StatsInner::default()),
        })
    }

    /// Whether the processor currently accepts work.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Enqueues one metric.
    ///
    /// Triggers an immediate flush when batching is disabled, when the
    /// queue reaches `max_batch_size`, or when the oldest queued item has
    /// waited past `max_wait_time`. A flush failure here is logged, not
    /// returned: the items stay queued for redelivery.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::NotRunning` when the processor is stopped; the
    /// queue is left untouched.
    pub fn add(&self, metric: Metric) -> BatchResult<()> {
        self.add_many(vec![metric])
    }

    /// Enqueues a batch of metrics with a single threshold check at the end.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::NotRunning` when the processor is stopped; the
    /// queue is left untouched.
    pub fn add_many(&self, metrics: Vec<Metric>) -> BatchResult<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(BatchError::NotRunning);
        }

        let (batching, threshold, max_wait) = {
            let config = self.config.read();
            (
                config.enable_batching,
                config.max_batch_size,
                config.max_wait_time,
            )
        };

        let should_flush = {
            let mut queue = self.queue.lock();
            for metric in metrics {
                queue.push_back(BatchItem::new(metric));
            }
            let overdue = queue.front().is_some_and(|item| {
                Utc::now() - item.added_at
                    >= chrono::Duration::from_std(max_wait).unwrap_or(chrono::Duration::MAX)
            });
            !batching || queue.len() >= threshold || overdue
        };

        if should_flush {
            if let Err(err) = self.flush() {
                // Items were re-enqueued; the scheduler or the next
                // threshold crossing will retry.
                warn!(error = %err, "size-triggered flush failed");
            }
        }

        Ok(())
    }

    /// Drains the entire pending queue into one storage write.
    ///
    /// A concurrent flush in progress makes this call a no-op returning
    /// `Ok(0)`; so does an empty queue (no stats change either way). On
    /// storage failure the drained items are put back at the front of the
    /// queue in their original order.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::FlushFailed` carrying the failed batch ids and
    /// the underlying storage error.
    pub fn flush(&self) -> BatchResult<usize> {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Another drain is running; its caller owns these items.
            return Ok(0);
        }

        let drained: Vec<BatchItem> = {
            let mut queue = self.queue.lock();
            queue.drain(..).collect()
        };

        if drained.is_empty() {
            self.flushing.store(false, Ordering::SeqCst);
            return Ok(0);
        }

        let count = drained.len();
        let started = Instant::now();
        let metrics: Vec<Metric> = drained.iter().map(|item| item.metric.clone()).collect();

        match self.store.record_many(metrics) {
            Ok(()) => {
                let elapsed_millis = started.elapsed().as_secs_f64() * 1000.0;
                let mut stats = self.stats.lock();
                stats.total_batches += 1;
                stats.total_metrics += count as u64;
                stats.successful_batches += 1;
                let flushes = stats.successful_batches as f64;
                stats.average_batch_size +=
                    (count as f64 - stats.average_batch_size) / flushes;
                stats.average_flush_millis +=
                    (elapsed_millis - stats.average_flush_millis) / flushes;
                stats.last_flush = Some(Utc::now());
                drop(stats);

                self.flushing.store(false, Ordering::SeqCst);
                debug!(count, "flushed batch");
                Ok(count)
            }
            Err(source) => {
                let failed_ids: Vec<Uuid> = drained.iter().map(|item| item.batch_id).collect();
                let recover = self.config.read().enable_partial_failure_recovery;
                if recover {
                    let mut queue = self.queue.lock();
                    for item in drained.into_iter().rev() {
                        queue.push_front(item);
                    }
                } else {
                    warn!(count, "dropping failed batch, redelivery disabled");
                }
                self.stats.lock().failed_batches += 1;
                self.flushing.store(false, Ordering::SeqCst);

                Err(BatchError::FlushFailed {
                    reason: source.to_string(),
                    failed_ids,
                    source,
                })
            }
        }
    }

    /// Marks the processor running and, when auto-flush is enabled, spawns
    /// the interval scheduler. A second call is a logged no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("batch processor already running");
            return;
        }
        info!("batch processor started");
        if self.config.read().enable_auto_flush {
            self.spawn_scheduler();
        }
    }

    /// Cancels the scheduler, runs one final drain, and marks the processor
    /// stopped. A second call is a logged no-op.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("batch processor already stopped");
            return;
        }
        if let Some(handle) = self.scheduler.lock().take() {
            handle.abort();
        }
        // Final drain so no accepted metric is stranded in the queue.
        if let Err(err) = self.flush() {
            warn!(error = %err, "final drain on stop failed");
        }
        info!("batch processor stopped");
    }

    /// Replaces the configuration, restarting the scheduler under the new
    /// interval when running with auto-flush enabled.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::InvalidConfiguration` when the new configuration
    /// violates its invariants; the old one stays in effect.
    pub fn configure(self: &Arc<Self>, config: BatchConfiguration) -> BatchResult<()> {
        config.validate()?;
        let auto_flush = config.enable_auto_flush;
        *self.config.write() = config;
        info!("batch configuration replaced");

        if self.running.load(Ordering::SeqCst) {
            if let Some(handle) = self.scheduler.lock().take() {
                handle.abort();
            }
            if auto_flush {
                self.spawn_scheduler();
            }
        }
        Ok(())
    }

    /// Merges a partial update over the current configuration.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::InvalidConfiguration` when the merged result
    /// violates the invariants; the old configuration stays in effect.
    pub fn update_configuration(
        self: &Arc<Self>,
        update: BatchConfigurationUpdate,
    ) -> BatchResult<()> {
        let merged = update.merge_into(&self.config.read());
        self.configure(merged)
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn configuration(&self) -> BatchConfiguration {
        self.config.read().clone()
    }

    /// Derives batch size and flush interval from a latency target and an
    /// observed throughput, then applies them via [`Self::configure`].
    ///
    /// Batch size is clamped to `[10, 1000]` and the interval to
    /// `[1s, 300s]`; a non-positive throughput falls back to a 30 second
    /// interval. Returns the applied configuration.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::InvalidConfiguration` if the tuned values fail
    /// validation.
    pub fn auto_tune(
        self: &Arc<Self>,
        target_latency: Duration,
        metrics_per_second: f64,
    ) -> BatchResult<BatchConfiguration> {
        let latency_millis = target_latency.as_secs_f64() * 1000.0;
        let optimal_batch =
            ((metrics_per_second * latency_millis / 1000.0).ceil() as i64).clamp(10, 1000) as usize;

        let optimal_interval = if metrics_per_second > 0.0 {
            Duration::from_secs_f64((optimal_batch as f64 / metrics_per_second).clamp(1.0, 300.0))
        } else {
            Duration::from_secs(30)
        };

        let mut config = self.config.read().clone();
        config.max_batch_size = optimal_batch;
        config.flush_interval = optimal_interval;
        if config.max_wait_time < config.flush_interval {
            config.max_wait_time = config.flush_interval;
        }

        info!(
            batch_size = optimal_batch,
            interval_secs = optimal_interval.as_secs_f64(),
            "auto-tuned batch configuration"
        );
        self.configure(config.clone())?;
        Ok(config)
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> BatchStats {
        let inner = self.stats.lock();
        BatchStats {
            total_batches: inner.total_batches,
            total_metrics: inner.total_metrics,
            successful_batches: inner.successful_batches,
            failed_batches: inner.failed_batches,
            average_batch_size: inner.average_batch_size,
            average_flush_millis: inner.average_flush_millis,
            pending: self.queue.lock().len(),
            is_running: self.running.load(Ordering::SeqCst),
            scheduler_active: self.scheduler.lock().is_some(),
            last_flush: inner.last_flush,
        }
    }

    /// Aggregates health signals into a report.
    ///
    /// Signals: not running, queue backlog over 1000, failure rate over
    /// 10%, last flush older than 5 minutes.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        let stats = self.stats();
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if !stats.is_running {
            issues.push("processor is not running".to_string());
            recommendations.push("call start() so queued metrics get flushed".to_string());
        }

        if stats.pending > BACKLOG_THRESHOLD {
            issues.push(format!("queue backlog of {} items", stats.pending));
            recommendations.push(
                "increase max_batch_size or shorten flush_interval".to_string(),
            );
        }

        let attempts = stats.successful_batches + stats.failed_batches;
        if attempts > 0 {
            let rate = stats.failed_batches as f64 / attempts as f64;
            if rate > FAILURE_RATE_THRESHOLD {
                issues.push(format!("flush failure rate at {:.0}%", rate * 100.0));
                recommendations
                    .push("check storage backend connectivity and capacity".to_string());
            }
        }

        if let Some(last) = stats.last_flush {
            if Utc::now() - last > STALE_FLUSH_AGE {
                issues.push("last successful flush is older than 5 minutes".to_string());
                recommendations
                    .push("verify the scheduler is running and storage is reachable".to_string());
            }
        }

        let state = if issues.is_empty() {
            HealthState::Healthy
        } else if issues.len() <= 2 && stats.is_running {
            HealthState::Degraded
        } else {
            HealthState::Unhealthy
        };

        HealthReport {
            state,
            issues,
            recommendations,
        }
    }

    /// Spawns the interval scheduler. Each tick flushes and drives the
    /// configured retry policy; per-tick errors are logged and swallowed so
    /// one failed tick never kills the schedule.
    fn spawn_scheduler(self: &Arc<Self>) {
        let processor = Arc::clone(self);
        let interval = self.config.read().flush_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so the first flush
            // happens one full interval after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !processor.running.load(Ordering::SeqCst) {
                    break;
                }
                processor.flush_with_retry().await;
            }
        });
        *self.scheduler.lock() = Some(handle);
        debug!(interval_secs = interval.as_secs_f64(), "flush scheduler started");
    }

    /// One scheduled flush attempt plus bounded retries with multiplicative
    /// backoff. Never returns an error; the queue keeps the items.
    async fn flush_with_retry(&self) {
        let retry = self.config.read().retry.clone();
        let mut backoff = retry.initial_backoff;

        for attempt in 0..=retry.max_retries {
            match self.flush() {
                Ok(_) => return,
                Err(err) => {
                    warn!(error = %err, attempt, "scheduled flush failed");
                    if attempt == retry.max_retries {
                        return;
                    }
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.mul_f64(retry.backoff_multiplier);
                }
            }
        }
    }
}

impl Drop for BatchProcessor {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduler.lock().take() {
            handle.abort();
        }
    }
}
