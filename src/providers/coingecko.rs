//! CoinGecko catalog and price provider implementation

use crate::{
    constants::{
        COINGECKO_API_URL, COINGECKO_COIN_LIST_ENDPOINT, COINGECKO_SIMPLE_PRICE_ENDPOINT,
        REQUEST_TIMEOUT_SECS, USER_AGENT,
    },
    error::ProviderError,
    provider::PriceProvider,
    types::{CoinListing, PriceSnapshot},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// CoinGecko API response for simple price queries
///
/// `{"bitcoin": {"usd": 12345.6, "usd_24h_change": -1.2}}`; values can be
/// `null` for thinly traded coins.
type CoinGeckoSimplePrice = HashMap<String, HashMap<String, Value>>;

/// CoinGecko price provider
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    /// Creates a new CoinGecko provider
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(COINGECKO_API_URL)
    }

    /// Creates a provider against a different API root (pro tier, proxies)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Builds the request for a single price with its 24h change
    fn price_request(&self, provider_id: &str, currency: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, COINGECKO_SIMPLE_PRICE_ENDPOINT))
            .query(&[
                ("ids", provider_id),
                ("vs_currencies", currency),
                ("include_24hr_change", "true"),
            ])
    }

    /// Sends a request and returns the body of a successful response
    async fn get_body(&self, request: RequestBuilder) -> Result<String, ProviderError> {
        let request = request.build().map_err(ProviderError::from_transport)?;
        tracing::debug!(url = %request.url(), "Requesting CoinGecko");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(ProviderError::from_transport)?;

        read_success_body(response).await
    }
}

/// Rejects rate limits and non-2xx statuses, returning the body otherwise
async fn read_success_body(response: Response) -> Result<String, ProviderError> {
    let status = response.status();

    if status.as_u16() == 429 {
        return Err(ProviderError::RateLimitExceeded);
    }

    if !status.is_success() {
        return Err(ProviderError::ApiError(format!(
            "HTTP {}: {}",
            status,
            response.text().await.unwrap_or_default()
        )));
    }

    response.text().await.map_err(ProviderError::from_transport)
}

/// Parses a `/coins/list` body
pub fn parse_coin_list(body: &str) -> Result<Vec<CoinListing>, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!("Failed to parse CoinGecko coin list: {}", e))
    })
}

/// Parses a `/simple/price` body for one id and currency
///
/// Reads `<id>.<currency>` and `<id>.<currency>_24h_change`. Both must be
/// present and numeric.
pub fn parse_simple_price(
    body: &str,
    provider_id: &str,
    currency: &str,
) -> Result<PriceSnapshot, ProviderError> {
    let response: CoinGeckoSimplePrice = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse CoinGecko response: {}. Response: {}",
            e, body
        ))
    })?;

    let entry = response.get(provider_id).ok_or_else(|| {
        ProviderError::InvalidResponse(format!("No price returned for {}", provider_id))
    })?;

    let change_key = format!("{}_24h_change", currency);
    let price = numeric_field(entry, currency, provider_id)?;
    let change = numeric_field(entry, &change_key, provider_id)?;

    Ok(PriceSnapshot::new(provider_id, currency, price, change))
}

fn numeric_field(
    entry: &HashMap<String, Value>,
    key: &str,
    provider_id: &str,
) -> Result<f64, ProviderError> {
    entry.get(key).and_then(Value::as_f64).ok_or_else(|| {
        ProviderError::InvalidResponse(format!(
            "Missing or non-numeric {} for {}",
            key, provider_id
        ))
    })
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    async fn fetch_coin_list(&self) -> Result<Vec<CoinListing>, ProviderError> {
        let url = format!("{}{}", self.base_url, COINGECKO_COIN_LIST_ENDPOINT);
        let body = self.get_body(self.client.get(url)).await?;
        let listing = parse_coin_list(&body)?;

        tracing::debug!(
            count = listing.len(),
            "Successfully fetched coin list from CoinGecko"
        );

        Ok(listing)
    }

    async fn fetch_price(
        &self,
        provider_id: &str,
        currency: &str,
    ) -> Result<PriceSnapshot, ProviderError> {
        let body = self.get_body(self.price_request(provider_id, currency)).await?;
        parse_simple_price(&body, provider_id, currency)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_price() {
        let body = r#"{"bitcoin": {"usd": 12345.678, "usd_24h_change": -1.234}}"#;
        let snapshot = parse_simple_price(body, "bitcoin", "usd").unwrap();

        assert_eq!(snapshot.provider_id, "bitcoin");
        assert_eq!(snapshot.currency, "usd");
        assert_eq!(snapshot.price, 12345.678);
        assert_eq!(snapshot.change_24h, -1.234);
    }

    #[test]
    fn test_parse_simple_price_reads_configured_currency() {
        let body = r#"{"bitcoin": {"usd": 1.0, "usd_24h_change": 0.5, "idr": 950000000, "idr_24h_change": 2.5}}"#;
        let snapshot = parse_simple_price(body, "bitcoin", "idr").unwrap();

        assert_eq!(snapshot.price, 950000000.0);
        assert_eq!(snapshot.change_24h, 2.5);
    }

    #[test]
    fn test_parse_simple_price_rejects_missing_id() {
        let err = parse_simple_price("{}", "bitcoin", "usd").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_simple_price_rejects_null_change() {
        let body = r#"{"obscure": {"usd": 0.01, "usd_24h_change": null}}"#;
        let err = parse_simple_price(body, "obscure", "usd").unwrap_err();
        assert!(err.to_string().contains("usd_24h_change"));
    }

    #[test]
    fn test_parse_simple_price_rejects_garbage() {
        assert!(parse_simple_price("<html>oops</html>", "bitcoin", "usd").is_err());
    }

    #[test]
    fn test_parse_coin_list_keeps_source_order() {
        let body = r#"[
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"},
            {"id": "batcat", "symbol": "BTC", "name": "Batcat"}
        ]"#;
        let listing = parse_coin_list(body).unwrap();

        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0], CoinListing::new("bitcoin", "btc", "Bitcoin"));
        assert_eq!(listing[1].symbol, "BTC");
    }

    #[test]
    fn test_price_request_url() {
        let provider = CoinGeckoProvider::with_base_url("https://example.test/api/v3/").unwrap();
        let request = provider.price_request("bitcoin", "usd").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://example.test/api/v3/simple/price?ids=bitcoin&vs_currencies=usd&include_24hr_change=true"
        );
    }

    #[test]
    fn test_price_request_encodes_query_values() {
        let provider = CoinGeckoProvider::with_base_url("https://example.test/api/v3").unwrap();
        let request = provider.price_request("wrapped bitcoin&x", "usd").build().unwrap();

        assert_eq!(
            request.url().query(),
            Some("ids=wrapped+bitcoin%26x&vs_currencies=usd&include_24hr_change=true")
        );
        let ids: Vec<_> = request
            .url()
            .query_pairs()
            .filter(|(key, _)| key == "ids")
            .map(|(_, value)| value.into_owned())
            .collect();
        assert_eq!(ids, vec!["wrapped bitcoin&x".to_string()]);
    }
}
