//! Periodic job scheduler with singleton execution
//!
//! Each job gets its own ticker task. On every tick the job is launched on the
//! runtime unless its previous run is still in progress, in which case the
//! tick is dropped (not queued). Jobs of different kinds never wait on each
//! other here; any mutual exclusion between them comes from their own locks.

use crate::{error::TickerError, metrics::JobMetrics};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

/// A unit of periodic work
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Runs the job body to completion
    async fn run(&self) -> Result<(), TickerError>;
}

/// Clears the in-progress flag when a run ends, including on panic
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A job wrapped with a non-blocking "skip if already running" trigger
#[derive(Clone)]
pub struct SingletonJob {
    job: Arc<dyn Job>,
    running: Arc<AtomicBool>,
    metrics: Arc<JobMetrics>,
}

impl SingletonJob {
    pub fn new(job: Arc<dyn Job>, metrics: Arc<JobMetrics>) -> Self {
        Self {
            job,
            running: Arc::new(AtomicBool::new(false)),
            metrics,
        }
    }

    pub fn name(&self) -> &'static str {
        self.job.name()
    }

    /// Returns true while a run is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Launches a run unless one is already in progress
    ///
    /// Returns the spawned run, or `None` when the trigger was dropped.
    pub fn trigger(&self) -> Option<JoinHandle<()>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(
                job = self.job.name(),
                "Previous run still in progress, skipping tick"
            );
            self.metrics.record_skip();
            return None;
        }

        let guard = RunningGuard(self.running.clone());
        let job = self.job.clone();
        let metrics = self.metrics.clone();
        let span = tracing::info_span!("job", job = job.name(), run_id = %Uuid::new_v4());

        Some(tokio::spawn(
            async move {
                let _guard = guard;
                let started = std::time::Instant::now();
                tracing::debug!("Starting job run");

                let result = job.run().await;
                let elapsed = started.elapsed();

                match &result {
                    Ok(()) => tracing::debug!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Job run finished"
                    ),
                    Err(e) => tracing::warn!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        kind = e.kind(),
                        error = %e,
                        "Job run failed"
                    ),
                }

                metrics.record_run(elapsed, result.is_ok()).await;
            }
            .instrument(span),
        ))
    }
}

struct Entry {
    job: SingletonJob,
    period: Duration,
    first_tick_in: Duration,
}

/// Builder for the set of periodic jobs
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `job` every `period`, starting immediately
    pub fn every(self, period: Duration, job: SingletonJob) -> Self {
        self.every_after(period, Duration::ZERO, job)
    }

    /// Runs `job` every `period`, first tick after `first_tick_in`
    pub fn every_after(mut self, period: Duration, first_tick_in: Duration, job: SingletonJob) -> Self {
        self.entries.push(Entry {
            job,
            period,
            first_tick_in,
        });
        self
    }

    /// Spawns one ticker task per job
    ///
    /// Must be called from within a tokio runtime. Periods must be non-zero.
    pub fn start(self) -> SchedulerHandle {
        let tickers = self
            .entries
            .into_iter()
            .map(|entry| {
                tracing::info!(
                    job = entry.job.name(),
                    period_secs = entry.period.as_secs_f64(),
                    "Scheduling job"
                );
                tokio::spawn(tick_loop(entry))
            })
            .collect();

        SchedulerHandle { tickers }
    }
}

async fn tick_loop(entry: Entry) {
    let mut ticker = interval_at(Instant::now() + entry.first_tick_in, entry.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let _ = entry.job.trigger();
    }
}

/// Running scheduler
pub struct SchedulerHandle {
    tickers: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops all tickers; runs already in flight are not waited for
    pub fn shutdown(self) {
        for ticker in self.tickers {
            ticker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    /// Job that sleeps and tracks how many copies of itself are running
    struct SlowJob {
        delay: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
        runs: AtomicUsize,
    }

    impl SlowJob {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                runs: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Job for SlowJob {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn run(&self) -> Result<(), TickerError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingJob;

    #[async_trait]
    impl Job for FailingJob {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn run(&self) -> Result<(), TickerError> {
            Err(ProviderError::Timeout.into())
        }
    }

    struct PanickingJob;

    #[async_trait]
    impl Job for PanickingJob {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn run(&self) -> Result<(), TickerError> {
            panic!("job blew up");
        }
    }

    #[tokio::test]
    async fn test_trigger_drops_while_running() {
        let job = Arc::new(SlowJob::new(Duration::from_millis(50)));
        let metrics = Arc::new(JobMetrics::new("slow"));
        let singleton = SingletonJob::new(job.clone(), metrics.clone());

        let first = singleton.trigger().expect("first trigger launches");
        assert!(singleton.is_running());
        assert!(singleton.trigger().is_none());

        first.await.unwrap();
        assert!(!singleton.is_running());
        singleton.trigger().expect("idle job launches again").await.unwrap();

        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
        let stats = metrics.get_metrics().await;
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.skipped_ticks, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_slow_job_never_overlaps_itself() {
        let job = Arc::new(SlowJob::new(Duration::from_millis(60)));
        let metrics = Arc::new(JobMetrics::new("slow"));

        let handle = Scheduler::new()
            .every(
                Duration::from_millis(10),
                SingletonJob::new(job.clone(), metrics.clone()),
            )
            .start();

        sleep(Duration::from_millis(300)).await;
        handle.shutdown();

        assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
        assert!(job.runs.load(Ordering::SeqCst) >= 2);
        assert!(metrics.get_metrics().await.skipped_ticks > 0);
    }

    #[tokio::test]
    async fn test_failed_run_returns_to_idle() {
        let metrics = Arc::new(JobMetrics::new("failing"));
        let singleton = SingletonJob::new(Arc::new(FailingJob), metrics.clone());

        singleton.trigger().unwrap().await.unwrap();

        assert!(!singleton.is_running());
        let stats = metrics.get_metrics().await;
        assert_eq!(stats.failed_runs, 1);
        assert_eq!(stats.last_run_ok, Some(false));
    }

    #[tokio::test]
    async fn test_panicking_run_returns_to_idle() {
        let singleton = SingletonJob::new(
            Arc::new(PanickingJob),
            Arc::new(JobMetrics::new("panicking")),
        );

        let result = singleton.trigger().unwrap().await;

        assert!(result.unwrap_err().is_panic());
        assert!(!singleton.is_running());
        assert!(singleton.trigger().is_some());
    }

    #[tokio::test]
    async fn test_delayed_first_tick() {
        let job = Arc::new(SlowJob::new(Duration::ZERO));
        let handle = Scheduler::new()
            .every_after(
                Duration::from_secs(3600),
                Duration::from_millis(200),
                SingletonJob::new(job.clone(), Arc::new(JobMetrics::new("slow"))),
            )
            .start();

        sleep(Duration::from_millis(50)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(300)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
        handle.shutdown();
    }
}
