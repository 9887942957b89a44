//! Error types for the coin ticker bot

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching data from an upstream API
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

impl ProviderError {
    /// Maps a transport error, separating timeouts from other failures
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }
}

/// Errors raised by the chat gateway while connecting or publishing
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The websocket could not be opened or broke during the handshake
    #[error("Gateway connection failed: {0}")]
    ConnectionFailed(String),

    /// The gateway refused the session (bad token, invalid session)
    #[error("Gateway handshake rejected ({code}): {reason}")]
    HandshakeRejected { code: u16, reason: String },

    /// A REST call was answered with a non-success status
    #[error("Gateway request rejected: {status} - {message}")]
    RequestRejected { status: u16, message: String },

    /// Rate limited by the chat API
    #[error("Rate limited by chat API")]
    RateLimited,

    /// The session's background connection is gone
    #[error("Gateway session closed")]
    SessionClosed,

    /// Timeout waiting for the gateway
    #[error("Gateway timeout")]
    Timeout,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        GatewayError::ConnectionFailed(err.to_string())
    }
}

/// Errors that can occur while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// None of the candidate locations held a config file
    #[error("No configuration file found (tried: {tried})")]
    NotFound { tried: String },

    /// The file exists but could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A field holds a value the bot cannot run with
    #[error("Invalid configuration at {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    /// Creates an Invalid error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failures of a ticker job run
#[derive(Debug, Error)]
pub enum TickerError {
    /// The symbol index has not completed its first refresh
    #[error("Symbol index is not initialized yet")]
    NotReady,

    /// A configured ticker has no provider id and no override
    #[error("No provider id found for symbol {symbol}")]
    ResolutionMiss { symbol: String },

    /// Upstream API failed (network, HTTP status or parsing)
    #[error("Upstream failure: {0}")]
    Upstream(#[from] ProviderError),

    /// Chat gateway refused or failed an update
    #[error("Publish failure: {0}")]
    Publish(#[from] GatewayError),
}

impl TickerError {
    /// Creates a ResolutionMiss error
    pub fn resolution_miss(symbol: &str) -> Self {
        Self::ResolutionMiss {
            symbol: symbol.to_string(),
        }
    }

    /// Short machine-friendly label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TickerError::NotReady => "not_ready",
            TickerError::ResolutionMiss { .. } => "resolution_miss",
            TickerError::Upstream(_) => "upstream_failure",
            TickerError::Publish(_) => "publish_failure",
        }
    }
}

/// Errors building the production collaborators at startup
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Failed to build API client: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to build chat gateway: {0}")]
    Gateway(#[from] GatewayError),
}
