//! Configuration loaded from `config.json`
//!
//! ```json
//! {
//!   "gasTickerConfig": {"apiKey": "...", "discordBotKey": "...", "guildID": "..."},
//!   "priceTickerConfig": {"coinList": [
//!     {"id": "btc", "coingeckoID": null, "decimalPlace": 2,
//!      "vsCurrencies": "usd", "discordBotKey": "...", "guildID": "..."}
//!   ]},
//!   "schedule": {"indexRefreshSecs": 3600, "priceUpdateSecs": 60, "gasUpdateSecs": 60}
//! }
//! ```
//!
//! Bot keys are secrets; the file must not be committed.

use crate::{
    constants::{GAS_UPDATE_INTERVAL_SECS, INDEX_REFRESH_INTERVAL_SECS, PRICE_UPDATE_INTERVAL_SECS},
    error::ConfigError,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Locations tried when `CONFIG_PATH` is unset
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["config.json", "config/config.json"];

/// Largest accepted `decimalPlace`
pub const MAX_DECIMAL_PLACES: usize = 18;

/// Root configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gas ticker bot settings
    pub gas_ticker_config: GasTickerConfig,

    /// Price ticker bots
    pub price_ticker_config: PriceTickerConfig,

    /// Job intervals
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Settings for the single gas ticker bot
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GasTickerConfig {
    /// ETH Gas Station API key
    pub api_key: String,

    /// Bot token publishing the gas ticker
    pub discord_bot_key: String,

    /// Guild whose nickname is updated
    #[serde(rename = "guildID")]
    pub guild_id: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PriceTickerConfig {
    pub coin_list: Vec<CoinConfig>,
}

/// One price ticker bot
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CoinConfig {
    /// Ticker shown in the nickname and looked up in the symbol index
    pub id: String,

    /// Provider id override, skipping the symbol index
    #[serde(rename = "coingeckoID", default)]
    pub coingecko_id: Option<String>,

    /// Decimal places for the displayed price
    pub decimal_place: usize,

    /// Target currency code, e.g. `usd`
    #[serde(rename = "vsCurrencies")]
    pub vs_currency: String,

    /// Bot token publishing this coin
    pub discord_bot_key: String,

    /// Guild whose nickname is updated
    #[serde(rename = "guildID")]
    pub guild_id: String,
}

impl CoinConfig {
    /// Currency code as sent to the price API
    pub fn currency(&self) -> String {
        self.vs_currency.trim().to_lowercase()
    }
}

/// Job intervals in seconds
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    #[serde(default = "default_index_refresh_secs")]
    pub index_refresh_secs: u64,
    #[serde(default = "default_price_update_secs")]
    pub price_update_secs: u64,
    #[serde(default = "default_gas_update_secs")]
    pub gas_update_secs: u64,
}

fn default_index_refresh_secs() -> u64 {
    INDEX_REFRESH_INTERVAL_SECS
}

fn default_price_update_secs() -> u64 {
    PRICE_UPDATE_INTERVAL_SECS
}

fn default_gas_update_secs() -> u64 {
    GAS_UPDATE_INTERVAL_SECS
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            index_refresh_secs: INDEX_REFRESH_INTERVAL_SECS,
            price_update_secs: PRICE_UPDATE_INTERVAL_SECS,
            gas_update_secs: GAS_UPDATE_INTERVAL_SECS,
        }
    }
}

impl ScheduleConfig {
    pub fn index_refresh(&self) -> Duration {
        Duration::from_secs(self.index_refresh_secs)
    }

    pub fn price_update(&self) -> Duration {
        Duration::from_secs(self.price_update_secs)
    }

    pub fn gas_update(&self) -> Duration {
        Duration::from_secs(self.gas_update_secs)
    }
}

impl Config {
    /// Parses and validates configuration JSON
    pub fn from_json(data: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data, path)
    }

    /// Finds the config file: `$CONFIG_PATH`, then the default locations
    pub fn resolve_path() -> Result<PathBuf, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        resolve_from(explicit, DEFAULT_CONFIG_PATHS)
    }

    /// Rejects values the bot cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gas = &self.gas_ticker_config;
        require_non_empty("gasTickerConfig.apiKey", &gas.api_key)?;
        require_non_empty("gasTickerConfig.discordBotKey", &gas.discord_bot_key)?;
        require_non_empty("gasTickerConfig.guildID", &gas.guild_id)?;

        for (i, coin) in self.price_ticker_config.coin_list.iter().enumerate() {
            let field = |name: &str| format!("priceTickerConfig.coinList[{}].{}", i, name);

            require_non_empty(&field("id"), &coin.id)?;
            require_non_empty(&field("vsCurrencies"), &coin.vs_currency)?;
            require_non_empty(&field("discordBotKey"), &coin.discord_bot_key)?;
            require_non_empty(&field("guildID"), &coin.guild_id)?;

            if let Some(id) = &coin.coingecko_id {
                require_non_empty(&field("coingeckoID"), id)?;
            }

            if coin.decimal_place > MAX_DECIMAL_PLACES {
                return Err(ConfigError::invalid(
                    field("decimalPlace"),
                    format!("must be at most {}", MAX_DECIMAL_PLACES),
                ));
            }
        }

        let schedule = &self.schedule;
        for (name, secs) in [
            ("schedule.indexRefreshSecs", schedule.index_refresh_secs),
            ("schedule.priceUpdateSecs", schedule.price_update_secs),
            ("schedule.gasUpdateSecs", schedule.gas_update_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::invalid(name, "must be greater than zero"));
            }
        }

        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    Ok(())
}

fn resolve_from(explicit: Option<PathBuf>, candidates: &[&str]) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    candidates
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .ok_or_else(|| ConfigError::NotFound {
            tried: candidates.join(", "),
        })
}
