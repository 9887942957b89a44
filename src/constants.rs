//! Constants for the coin ticker bot
//!
//! Endpoints, timeouts and default schedule intervals live here. Anything an
//! operator is expected to tune (coins, credentials, intervals) comes from the
//! JSON configuration instead, see [`crate::config`].

/// Default interval between symbol index refreshes (in seconds)
pub const INDEX_REFRESH_INTERVAL_SECS: u64 = 3600;

/// Default interval between price ticker updates (in seconds)
pub const PRICE_UPDATE_INTERVAL_SECS: u64 = 60;

/// Default interval between gas ticker updates (in seconds)
pub const GAS_UPDATE_INTERVAL_SECS: u64 = 60;

/// HTTP request timeout for every outbound API call (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Number of job run samples kept for latency percentiles
pub const METRICS_WINDOW: usize = 100;

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko endpoint listing every known coin
pub const COINGECKO_COIN_LIST_ENDPOINT: &str = "/coins/list";

/// CoinGecko API endpoint for simple price queries
pub const COINGECKO_SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";

/// ETH Gas Station API base URL
pub const ETHGASSTATION_API_URL: &str = "https://ethgasstation.info/api";

/// ETH Gas Station gas price endpoint
pub const ETHGASSTATION_GAS_ENDPOINT: &str = "/ethgasAPI.json";

/// Discord REST API base URL
pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Discord gateway websocket URL
pub const DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Upper bound on the HELLO -> IDENTIFY -> READY handshake (in seconds)
pub const GATEWAY_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Delay before re-establishing a dropped gateway connection (in seconds)
pub const GATEWAY_RECONNECT_DELAY_SECS: u64 = 5;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-ticker-bot/0.1.0";
