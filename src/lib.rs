//! # Coin Ticker Bot
//!
//! Publishes cryptocurrency prices and Ethereum gas fees as Discord bot
//! nicknames and "Listening to" statuses, refreshed on a fixed schedule.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler (one ticker task per job, overlapping ticks dropped)
//!     ├── index_refresh (hourly) → SymbolIndex ← CoinGecko /coins/list
//!     ├── price_update (minute)  → PriceUpdater → CoinGecko /simple/price
//!     │                                 ↓
//!     └── gas_update (minute)    → GasUpdater  → ETH Gas Station
//!                                       ↓
//!                                  SessionPool (one Discord session per bot token)
//! ```
//!
//! The price run and the index refresh share one exclusive lock, so a price
//! pass never observes a half-built index. The gas run is independent.
//!
//! ## Usage
//!
//! ```no_run
//! use coin_ticker_bot::{Config, TickerCore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(&Config::resolve_path()?)?;
//! let core = TickerCore::new(config)?;
//!
//! if let Err(e) = core.refresh_index().await {
//!     eprintln!("Index not ready yet: {}", e);
//! }
//!
//! let scheduler = core.scheduler().start();
//! tokio::signal::ctrl_c().await?;
//! scheduler.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use coin_ticker_bot::{TickerCore, TickerError};
//!
//! # async fn example(core: &TickerCore) {
//! match core.update_price_ticker().await {
//!     Ok(summary) => println!("published {:?}", summary.published),
//!     Err(TickerError::NotReady) => println!("symbol index not built yet"),
//!     Err(TickerError::Publish(e)) => eprintln!("Discord refused the update: {}", e),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod index;
pub mod logging;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod scheduler;
pub mod sessions;
pub mod ticker;
pub mod types;
pub mod updater;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, GatewayError, ProviderError, SetupError, TickerError};
pub use index::SymbolIndex;
pub use metrics::JobStats;
pub use scheduler::{Job, Scheduler, SchedulerHandle, SingletonJob};
pub use sessions::SessionPool;
pub use ticker::TickerCore;
pub use types::{CoinListing, ComponentHealth, GasSnapshot, HealthStatus, PriceSnapshot};
