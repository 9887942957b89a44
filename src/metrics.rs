//! Job run metrics collection and reporting
//!
//! Tracks run latency percentiles, success rates and skipped ticks for each
//! scheduled job.

use crate::constants::METRICS_WINDOW;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Metrics for a single job
#[derive(Debug, Clone)]
pub struct JobStats {
    /// Name of the job
    pub job_name: String,
    /// 50th percentile run duration in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile run duration in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of completed runs
    pub total_runs: u64,
    /// Number of failed runs
    pub failed_runs: u64,
    /// Ticks dropped because the previous run was still in progress
    pub skipped_ticks: u64,
    /// When the last run finished
    pub last_run_at: Option<DateTime<Utc>>,
    /// Whether the last run succeeded
    pub last_run_ok: Option<bool>,
}

impl JobStats {
    /// Creates stats with no data
    pub fn empty(job_name: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_runs: 0,
            failed_runs: 0,
            skipped_ticks: 0,
            last_run_at: None,
            last_run_ok: None,
        }
    }
}

/// Internal sample for latency tracking
#[derive(Debug, Clone)]
struct RunSample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct RunTotals {
    total: u64,
    failed: u64,
    last_run_at: Option<DateTime<Utc>>,
    last_run_ok: Option<bool>,
}

/// Collects and computes metrics for one job
pub struct JobMetrics {
    job_name: String,
    samples: RwLock<VecDeque<RunSample>>,
    totals: RwLock<RunTotals>,
    skipped: AtomicU64,
}

impl JobMetrics {
    /// Creates a new metrics collector for a job
    pub fn new(job_name: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
            samples: RwLock::new(VecDeque::with_capacity(METRICS_WINDOW)),
            totals: RwLock::new(RunTotals::default()),
            skipped: AtomicU64::new(0),
        }
    }

    /// Records a finished run with its duration and outcome
    pub async fn record_run(&self, duration: Duration, success: bool) {
        let duration_ms = duration.as_secs_f64() * 1000.0;

        {
            let mut totals = self.totals.write().await;
            totals.total += 1;
            if !success {
                totals.failed += 1;
            }
            totals.last_run_at = Some(Utc::now());
            totals.last_run_ok = Some(success);
        }

        let mut samples = self.samples.write().await;
        if samples.len() >= METRICS_WINDOW {
            samples.pop_front();
        }
        samples.push_back(RunSample {
            duration_ms,
            success,
        });
    }

    /// Records a tick dropped by the singleton rule
    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Computes current stats from collected samples
    pub async fn get_metrics(&self) -> JobStats {
        let samples = self.samples.read().await;
        let totals = self.totals.read().await;
        let skipped_ticks = self.skipped.load(Ordering::Relaxed);

        if samples.is_empty() {
            return JobStats {
                skipped_ticks,
                ..JobStats::empty(&self.job_name)
            };
        }

        let mut latencies: Vec<f64> = samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();

        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if totals.total > 0 {
            (totals.total - totals.failed) as f64 / totals.total as f64
        } else {
            1.0
        };

        JobStats {
            job_name: self.job_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_runs: totals.total,
            failed_runs: totals.failed,
            skipped_ticks,
            last_run_at: totals.last_run_at,
            last_run_ok: totals.last_run_ok,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
