//! Upstream API provider implementations

pub mod coingecko;
pub mod ethgasstation;

pub use coingecko::CoinGeckoProvider;
pub use ethgasstation::EthGasStationProvider;
