//! Coordinating object owning the shared ticker state
//!
//! ```text
//! TickerCore
//!     ├── SymbolIndex  ← index_refresh job (hourly)
//!     ├── SessionPool
//!     ├── PriceUpdater ← price_update job (every minute, uses index + pool)
//!     └── GasUpdater   ← gas_update job (every minute, uses pool)
//! ```

use crate::{
    config::{Config, ScheduleConfig},
    error::{SetupError, TickerError},
    gateway::{DiscordGateway, Gateway},
    index::SymbolIndex,
    metrics::{JobMetrics, JobStats},
    provider::{GasProvider, PriceProvider},
    providers::{CoinGeckoProvider, EthGasStationProvider},
    scheduler::{Job, Scheduler, SingletonJob},
    sessions::SessionPool,
    types::{ComponentHealth, HealthStatus},
    updater::{GasUpdater, PriceRunSummary, PriceUpdater},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub const INDEX_REFRESH_JOB: &str = "index_refresh";
pub const PRICE_UPDATE_JOB: &str = "price_update";
pub const GAS_UPDATE_JOB: &str = "gas_update";

#[async_trait]
impl Job for SymbolIndex {
    fn name(&self) -> &'static str {
        INDEX_REFRESH_JOB
    }

    async fn run(&self) -> Result<(), TickerError> {
        self.refresh().await.map(|_| ())
    }
}

#[async_trait]
impl Job for PriceUpdater {
    fn name(&self) -> &'static str {
        PRICE_UPDATE_JOB
    }

    async fn run(&self) -> Result<(), TickerError> {
        PriceUpdater::run(self).await.map(|_| ())
    }
}

#[async_trait]
impl Job for GasUpdater {
    fn name(&self) -> &'static str {
        GAS_UPDATE_JOB
    }

    async fn run(&self) -> Result<(), TickerError> {
        GasUpdater::run(self).await
    }
}

/// Owner of the symbol index, session pool and both updaters
pub struct TickerCore {
    schedule: ScheduleConfig,
    index: Arc<SymbolIndex>,
    sessions: Arc<SessionPool>,
    price: Arc<PriceUpdater>,
    gas: Arc<GasUpdater>,
    index_metrics: Arc<JobMetrics>,
    price_metrics: Arc<JobMetrics>,
    gas_metrics: Arc<JobMetrics>,
}

impl TickerCore {
    /// Creates a core talking to CoinGecko, ETH Gas Station and Discord
    pub fn new(config: Config) -> Result<Self, SetupError> {
        let price_provider = Arc::new(CoinGeckoProvider::new()?);
        let gas_provider = Arc::new(EthGasStationProvider::new(
            config.gas_ticker_config.api_key.clone(),
        )?);
        let gateway = Arc::new(DiscordGateway::new()?);

        Ok(Self::with_components(
            config,
            price_provider,
            gas_provider,
            gateway,
        ))
    }

    /// Creates a core with explicit collaborators
    ///
    /// This is primarily for testing with mock providers and gateways.
    pub fn with_components(
        config: Config,
        price_provider: Arc<dyn PriceProvider>,
        gas_provider: Arc<dyn GasProvider>,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        let index = Arc::new(SymbolIndex::new(price_provider.clone()));
        let sessions = Arc::new(SessionPool::new(gateway));

        let price = Arc::new(PriceUpdater::new(
            config.price_ticker_config.coin_list,
            index.clone(),
            sessions.clone(),
            price_provider,
        ));
        let gas = Arc::new(GasUpdater::new(
            config.gas_ticker_config,
            sessions.clone(),
            gas_provider,
        ));

        Self {
            schedule: config.schedule,
            index,
            sessions,
            price,
            gas,
            index_metrics: Arc::new(JobMetrics::new(INDEX_REFRESH_JOB)),
            price_metrics: Arc::new(JobMetrics::new(PRICE_UPDATE_JOB)),
            gas_metrics: Arc::new(JobMetrics::new(GAS_UPDATE_JOB)),
        }
    }

    /// Rebuilds the symbol index now
    pub async fn refresh_index(&self) -> Result<usize, TickerError> {
        self.index.refresh().await
    }

    /// Runs one price ticker pass now
    pub async fn update_price_ticker(&self) -> Result<PriceRunSummary, TickerError> {
        self.price.run().await
    }

    /// Runs one gas ticker update now
    pub async fn update_gas_ticker(&self) -> Result<(), TickerError> {
        self.gas.run().await
    }

    /// Builds the scheduler for all three jobs
    ///
    /// The index job's first tick is one period out since startup refreshes
    /// the index directly; price and gas jobs tick immediately.
    pub fn scheduler(&self) -> Scheduler {
        let index_job: Arc<dyn Job> = self.index.clone();
        let price_job: Arc<dyn Job> = self.price.clone();
        let gas_job: Arc<dyn Job> = self.gas.clone();

        Scheduler::new()
            .every_after(
                self.schedule.index_refresh(),
                self.schedule.index_refresh(),
                SingletonJob::new(index_job, self.index_metrics.clone()),
            )
            .every(
                self.schedule.price_update(),
                SingletonJob::new(price_job, self.price_metrics.clone()),
            )
            .every(
                self.schedule.gas_update(),
                SingletonJob::new(gas_job, self.gas_metrics.clone()),
            )
    }

    pub fn index(&self) -> &Arc<SymbolIndex> {
        &self.index
    }

    pub fn sessions(&self) -> &Arc<SessionPool> {
        &self.sessions
    }

    /// Stats for every scheduled job
    pub async fn job_metrics(&self) -> Vec<JobStats> {
        vec![
            self.index_metrics.get_metrics().await,
            self.price_metrics.get_metrics().await,
            self.gas_metrics.get_metrics().await,
        ]
    }

    /// Perform a health check on the ticker core
    ///
    /// # Returns
    /// ComponentHealth indicating the status of the index and the jobs
    pub async fn health_check(&self) -> ComponentHealth {
        let mut details = HashMap::new();

        let ready = self.index.is_ready().await;
        details.insert("index_ready".to_string(), serde_json::json!(ready));
        details.insert(
            "index_symbols".to_string(),
            serde_json::json!(self.index.len().await),
        );
        details.insert(
            "index_refreshed_at".to_string(),
            serde_json::json!(self.index.refreshed_at().await),
        );
        details.insert(
            "open_sessions".to_string(),
            serde_json::json!(self.sessions.len().await),
        );

        let jobs = self.job_metrics().await;
        let mut failing_jobs = Vec::new();
        for stats in &jobs {
            if stats.last_run_ok == Some(false) {
                failing_jobs.push(stats.job_name.clone());
            }
            details.insert(
                stats.job_name.clone(),
                serde_json::json!({
                    "total_runs": stats.total_runs,
                    "failed_runs": stats.failed_runs,
                    "skipped_ticks": stats.skipped_ticks,
                    "latency_p50_ms": stats.latency_p50_ms,
                    "latency_p99_ms": stats.latency_p99_ms,
                    "last_run_at": stats.last_run_at,
                }),
            );
        }
        details.insert("failing_jobs".to_string(), serde_json::json!(failing_jobs));

        let status = if !ready {
            HealthStatus::Unhealthy
        } else if !failing_jobs.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => "Ticker is operational".to_string(),
            HealthStatus::Degraded => format!(
                "Ticker has {} job(s) whose last run failed",
                failing_jobs.len()
            ),
            HealthStatus::Unhealthy => "Symbol index has not been built yet".to_string(),
        };

        ComponentHealth {
            name: "ticker_core".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}
