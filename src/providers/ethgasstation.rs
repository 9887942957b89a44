//! ETH Gas Station gas fee provider implementation

use crate::{
    constants::{ETHGASSTATION_API_URL, ETHGASSTATION_GAS_ENDPOINT, REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::ProviderError,
    provider::GasProvider,
    types::GasSnapshot,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// ETH Gas Station provider
pub struct EthGasStationProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EthGasStationProvider {
    /// Creates a new ETH Gas Station provider
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(ETHGASSTATION_API_URL, api_key)
    }

    /// Creates a provider against a different API root
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

/// Parses an `/ethgasAPI.json` body
pub fn parse_gas_response(body: &str) -> Result<GasSnapshot, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse ETH Gas Station response: {}. Response: {}",
            e, body
        ))
    })
}

#[async_trait]
impl GasProvider for EthGasStationProvider {
    async fn fetch_gas(&self) -> Result<GasSnapshot, ProviderError> {
        let url = format!("{}{}", self.base_url, ETHGASSTATION_GAS_ENDPOINT);
        tracing::debug!(url = %url, "Fetching gas prices from ETH Gas Station");

        // The key travels as a query parameter so it never ends up in the logged URL
        let response = self
            .client
            .get(&url)
            .query(&[("api-key", self.api_key.as_str())])
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response.text().await.map_err(ProviderError::from_transport)?;
        parse_gas_response(&body)
    }

    fn provider_name(&self) -> &'static str {
        "ethgasstation"
    }
}
