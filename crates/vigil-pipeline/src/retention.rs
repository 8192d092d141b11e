//! Periodic retention sweeping.
//!
//! The [`RetentionSweeper`] drives [`MetricStore::cleanup_with`] on the
//! policy's `cleanup_interval`, tracks rolling sweep statistics over the
//! last hundred runs, and accepts hot policy reloads without a restart.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vigil_metrics::{MetricStore, RetentionPolicy};

use crate::error::{RetentionError, RetentionResult};

/// How many recent sweep durations the rolling average covers.
const SWEEP_WINDOW: usize = 100;

/// Sweep statistics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepStats {
    /// Sweeps completed successfully.
    pub total_runs: u64,
    /// Sweeps that failed in the store.
    pub failed_runs: u64,
    /// Metrics removed across all successful sweeps.
    pub total_removed: u64,
    /// Metrics removed by the most recent successful sweep.
    pub last_removed: usize,
    /// Completion time of the most recent successful sweep.
    pub last_run: Option<DateTime<Utc>>,
    /// Duration of the most recent successful sweep in milliseconds.
    pub last_sweep_millis: f64,
    /// Mean sweep duration in milliseconds over the last hundred runs.
    pub average_sweep_millis: f64,
    /// Whether the background sweeper is active.
    pub is_running: bool,
}

#[derive(Debug, Default)]
struct SweepInner {
    total_runs: u64,
    failed_runs: u64,
    total_removed: u64,
    last_removed: usize,
    last_run: Option<DateTime<Utc>>,
    last_sweep_millis: f64,
    durations: VecDeque<f64>,
}

impl SweepInner {
    fn record_success(&mut self, removed: usize, millis: f64) {
        self.total_runs += 1;
        self.total_removed += removed as u64;
        self.last_removed = removed;
        self.last_run = Some(Utc::now());
        self.last_sweep_millis = millis;
        self.durations.push_back(millis);
        if self.durations.len() > SWEEP_WINDOW {
            self.durations.pop_front();
        }
    }

    fn average_millis(&self) -> f64 {
        if self.durations.is_empty() {
            0.0
        } else {
            self.durations.iter().sum::<f64>() / self.durations.len() as f64
        }
    }
}

/// Background task enforcing a retention policy against a store.
pub struct RetentionSweeper {
    store: Arc<MetricStore>,
    policy: RwLock<RetentionPolicy>,
    running: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
    inner: Mutex<SweepInner>,
}

impl std::fmt::Debug for RetentionSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionSweeper")
            .field("running", &self.running.load(Ordering::SeqCst))
            .field("policy", &*self.policy.read())
            .finish_non_exhaustive()
    }
}

impl RetentionSweeper {
    /// Creates a stopped sweeper bound to a store.
    ///
    /// # Errors
    ///
    /// Returns `RetentionError::InvalidPolicy` when the policy violates its
    /// invariants.
    pub fn new(store: Arc<MetricStore>, policy: RetentionPolicy) -> RetentionResult<Self> {
        policy
            .validate()
            .map_err(|err| RetentionError::InvalidPolicy {
                reason: err.to_string(),
            })?;
        Ok(Self {
            store,
            policy: RwLock::new(policy),
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
            inner: Mutex::new(SweepInner::default()),
        })
    }

    /// Whether the background sweeper is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The policy currently in effect.
    #[must_use]
    pub fn policy(&self) -> RetentionPolicy {
        *self.policy.read()
    }

    /// Runs one sweep immediately, outside the schedule.
    ///
    /// Returns the number of metrics removed. Successful sweeps feed the
    /// rolling duration window; failures only increment the failure count.
    ///
    /// # Errors
    ///
    /// Returns `RetentionError::SweepFailed` when the store cleanup fails.
    pub fn run_once(&self) -> RetentionResult<usize> {
        let policy = *self.policy.read();
        let started = Instant::now();

        match self.store.cleanup_with(&policy) {
            Ok(removed) => {
                let millis = started.elapsed().as_secs_f64() * 1000.0;
                self.inner.lock().record_success(removed, millis);
                debug!(removed, millis, "retention sweep complete");
                Ok(removed)
            }
            Err(source) => {
                self.inner.lock().failed_runs += 1;
                Err(RetentionError::SweepFailed { source })
            }
        }
    }

    /// Starts the background sweep loop on the policy's `cleanup_interval`.
    /// A second call is a logged no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("retention sweeper already running");
            return;
        }
        self.spawn_loop();
        info!(
            interval_secs = self.policy.read().cleanup_interval.as_secs_f64(),
            "retention sweeper started"
        );
    }

    /// Cancels the background loop. A second call is a logged no-op.
    /// Statistics survive across stop/start cycles.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("retention sweeper already stopped");
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
        info!("retention sweeper stopped");
    }

    /// Replaces the policy. When the sweeper is running the loop restarts
    /// so a changed `cleanup_interval` takes effect immediately.
    ///
    /// # Errors
    ///
    /// Returns `RetentionError::InvalidPolicy` when the new policy violates
    /// its invariants; the old one stays in effect.
    pub fn update_policy(self: &Arc<Self>, policy: RetentionPolicy) -> RetentionResult<()> {
        policy
            .validate()
            .map_err(|err| RetentionError::InvalidPolicy {
                reason: err.to_string(),
            })?;
        if policy.cleanup_interval < Duration::from_secs(60) {
            warn!(
                interval_secs = policy.cleanup_interval.as_secs_f64(),
                "cleanup_interval below one minute will sweep aggressively"
            );
        }
        if policy.max_age < Duration::from_secs(5 * 60) {
            warn!(
                max_age_secs = policy.max_age.as_secs_f64(),
                "max_age below five minutes will evict recent metrics"
            );
        }
        *self.policy.write() = policy;
        info!("retention policy replaced");

        if self.running.load(Ordering::SeqCst) {
            if let Some(handle) = self.handle.lock().take() {
                handle.abort();
            }
            self.spawn_loop();
        }
        Ok(())
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> SweepStats {
        let inner = self.inner.lock();
        SweepStats {
            total_runs: inner.total_runs,
            failed_runs: inner.failed_runs,
            total_removed: inner.total_removed,
            last_removed: inner.last_removed,
            last_run: inner.last_run,
            last_sweep_millis: inner.last_sweep_millis,
            average_sweep_millis: inner.average_millis(),
            is_running: self.running.load(Ordering::SeqCst),
        }
    }

    /// Spawns the interval loop. Sweep errors are logged and swallowed so
    /// one failed sweep never kills the schedule.
    fn spawn_loop(self: &Arc<Self>) {
        let sweeper = Arc::clone(self);
        let interval = self.policy.read().cleanup_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so the first sweep
            // happens one full interval after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !sweeper.running.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(err) = sweeper.run_once() {
                    warn!(error = %err, "scheduled retention sweep failed");
                }
            }
        });
        *self.handle.lock() = Some(handle);
    }
}

impl Drop for RetentionSweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}
