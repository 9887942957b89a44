//! Types shared between providers, updaters and the coordinating core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the provider catalog (`/coins/list`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinListing {
    /// Provider id, e.g. `bitcoin`
    pub id: String,
    /// Trading ticker as listed, e.g. `btc`
    pub symbol: String,
    /// Human readable name
    pub name: String,
}

impl CoinListing {
    /// Create a new catalog entry
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// Price of one coin in one target currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Provider id the price was requested for
    pub provider_id: String,

    /// Target currency code (lowercase)
    pub currency: String,

    /// Price in the target currency
    pub price: f64,

    /// 24h price change percentage
    pub change_24h: f64,

    /// When the snapshot was fetched
    pub fetched_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Create a snapshot stamped with the current time
    pub fn new(provider_id: &str, currency: &str, price: f64, change_24h: f64) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            currency: currency.to_string(),
            price,
            change_24h,
            fetched_at: Utc::now(),
        }
    }
}

/// Gas fee levels as reported by ETH Gas Station
///
/// Fee fields are in tenths of a gwei.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasSnapshot {
    pub fast: i64,
    pub fastest: i64,
    pub safe_low: i64,
    pub average: i64,
    #[serde(default, alias = "block_time")]
    pub block_time: f64,
    #[serde(default)]
    pub block_num: i64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub safe_low_wait: f64,
    #[serde(default)]
    pub avg_wait: f64,
    #[serde(default)]
    pub fast_wait: f64,
    #[serde(default)]
    pub fastest_wait: f64,
}

impl GasSnapshot {
    /// Average fee in whole gwei
    pub fn average_gwei(&self) -> i64 {
        self.average / 10
    }

    /// Fast fee in whole gwei
    pub fn fast_gwei(&self) -> i64 {
        self.fast / 10
    }

    /// Safe-low fee in whole gwei
    pub fn safe_low_gwei(&self) -> i64 {
        self.safe_low / 10
    }
}

/// Overall system health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Index is ready and every job's last run succeeded
    Healthy,
    /// Index is ready but at least one job's last run failed
    Degraded,
    /// Index has never been built
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
