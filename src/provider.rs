//! Provider abstraction for the upstream price and gas APIs

use crate::{
    error::ProviderError,
    types::{CoinListing, GasSnapshot, PriceSnapshot},
};
use async_trait::async_trait;

/// Trait for coin catalog and price providers
///
/// Implementations talk to a pricing API that identifies assets by its own
/// provider ids (CoinGecko's `bitcoin` for ticker `btc`).
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetches the full catalog of `{id, symbol, name}` triples
    ///
    /// Order matters: callers building a symbol lookup let later entries
    /// override earlier ones.
    async fn fetch_coin_list(&self) -> Result<Vec<CoinListing>, ProviderError>;

    /// Fetches price and 24h change for one provider id
    ///
    /// # Arguments
    /// * `provider_id` - The provider's id for the asset
    /// * `currency` - Lowercase target currency code, e.g. `usd`
    async fn fetch_price(
        &self,
        provider_id: &str,
        currency: &str,
    ) -> Result<PriceSnapshot, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

/// Trait for gas fee providers
#[async_trait]
pub trait GasProvider: Send + Sync {
    /// Fetches the current gas fee levels
    async fn fetch_gas(&self) -> Result<GasSnapshot, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Scripted<T> = Arc<Mutex<VecDeque<Result<T, ProviderError>>>>;

    /// Mock price provider for testing
    ///
    /// Coin list responses are scripted as a queue; once the queue is drained
    /// the last successful listing is served again.
    pub struct MockPriceProvider {
        listings: Scripted<Vec<CoinListing>>,
        last_listing: Arc<Mutex<Vec<CoinListing>>>,
        prices: Arc<Mutex<HashMap<String, (f64, f64)>>>,
        failing_ids: Arc<Mutex<Vec<String>>>,
        list_calls: Arc<Mutex<usize>>,
        price_calls: Arc<Mutex<Vec<(String, String)>>>,
        price_delay: Arc<Mutex<Duration>>,
    }

    impl Default for MockPriceProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockPriceProvider {
        pub fn new() -> Self {
            Self {
                listings: Arc::new(Mutex::new(VecDeque::new())),
                last_listing: Arc::new(Mutex::new(Vec::new())),
                prices: Arc::new(Mutex::new(HashMap::new())),
                failing_ids: Arc::new(Mutex::new(Vec::new())),
                list_calls: Arc::new(Mutex::new(0)),
                price_calls: Arc::new(Mutex::new(Vec::new())),
                price_delay: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        pub fn push_listing(&self, listing: Vec<CoinListing>) {
            self.listings.lock().unwrap().push_back(Ok(listing));
        }

        pub fn push_listing_error(&self, error: ProviderError) {
            self.listings.lock().unwrap().push_back(Err(error));
        }

        pub fn set_price(&self, provider_id: &str, price: f64, change_24h: f64) {
            self.prices
                .lock()
                .unwrap()
                .insert(provider_id.to_string(), (price, change_24h));
        }

        pub fn fail_price(&self, provider_id: &str) {
            self.failing_ids
                .lock()
                .unwrap()
                .push(provider_id.to_string());
        }

        /// Makes every price fetch take `delay`
        pub fn set_price_delay(&self, delay: Duration) {
            *self.price_delay.lock().unwrap() = delay;
        }

        pub fn list_calls(&self) -> usize {
            *self.list_calls.lock().unwrap()
        }

        pub fn price_calls(&self) -> Vec<(String, String)> {
            self.price_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceProvider for MockPriceProvider {
        async fn fetch_coin_list(&self) -> Result<Vec<CoinListing>, ProviderError> {
            *self.list_calls.lock().unwrap() += 1;
            match self.listings.lock().unwrap().pop_front() {
                Some(Ok(listing)) => {
                    *self.last_listing.lock().unwrap() = listing.clone();
                    Ok(listing)
                }
                Some(Err(err)) => Err(err),
                None => Ok(self.last_listing.lock().unwrap().clone()),
            }
        }

        async fn fetch_price(
            &self,
            provider_id: &str,
            currency: &str,
        ) -> Result<PriceSnapshot, ProviderError> {
            self.price_calls
                .lock()
                .unwrap()
                .push((provider_id.to_string(), currency.to_string()));

            let delay = *self.price_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            if self.failing_ids.lock().unwrap().iter().any(|id| id == provider_id) {
                return Err(ProviderError::ApiError("HTTP 500: mock failure".to_string()));
            }

            match self.prices.lock().unwrap().get(provider_id) {
                Some((price, change)) => {
                    Ok(PriceSnapshot::new(provider_id, currency, *price, *change))
                }
                None => Err(ProviderError::InvalidResponse(format!(
                    "no price for {}",
                    provider_id
                ))),
            }
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    /// Mock gas provider for testing
    pub struct MockGasProvider {
        response: Arc<Mutex<Option<GasSnapshot>>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockGasProvider {
        /// Serves `snapshot` on every call; `None` simulates an upstream failure
        pub fn new(snapshot: Option<GasSnapshot>) -> Self {
            Self {
                response: Arc::new(Mutex::new(snapshot)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl GasProvider for MockGasProvider {
        async fn fetch_gas(&self) -> Result<GasSnapshot, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            self.response
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ProviderError::ApiError("HTTP 503: mock outage".to_string()))
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    /// Builds a gas snapshot with only the fee levels set
    pub fn gas_snapshot(average: i64, fast: i64, safe_low: i64) -> GasSnapshot {
        GasSnapshot {
            fast,
            fastest: fast,
            safe_low,
            average,
            block_time: 0.0,
            block_num: 0,
            speed: 0.0,
            safe_low_wait: 0.0,
            avg_wait: 0.0,
            fast_wait: 0.0,
            fastest_wait: 0.0,
        }
    }
}
