//! Symbol to provider-id index

use crate::{
    error::TickerError,
    provider::PriceProvider,
    types::CoinListing,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// Mapping plus readiness, always replaced together
#[derive(Debug, Default)]
struct IndexState {
    mapping: HashMap<String, String>,
    ready: bool,
    refreshed_at: Option<DateTime<Utc>>,
}

impl IndexState {
    fn lookup(&self, symbol: &str) -> Result<&str, TickerError> {
        if !self.ready {
            return Err(TickerError::NotReady);
        }
        self.mapping
            .get(&symbol.to_lowercase())
            .map(String::as_str)
            .ok_or_else(|| TickerError::resolution_miss(symbol))
    }
}

/// Builds a lowercase symbol → provider id mapping
///
/// Duplicate symbols resolve to the entry appearing last in `listing`.
pub fn build_mapping(listing: &[CoinListing]) -> HashMap<String, String> {
    let mut mapping = HashMap::with_capacity(listing.len());
    for coin in listing {
        mapping.insert(coin.symbol.to_lowercase(), coin.id.clone());
    }
    mapping
}

/// Lowercase ticker → provider id lookup, rebuilt wholesale from the catalog
///
/// Not ready until the first successful [`refresh`](Self::refresh). A failed
/// refresh keeps whatever mapping was there before.
pub struct SymbolIndex {
    catalog: Arc<dyn PriceProvider>,
    state: RwLock<IndexState>,
}

/// Exclusive hold on the index, used by the price run for its whole iteration
pub struct IndexGuard<'a> {
    state: RwLockWriteGuard<'a, IndexState>,
}

impl IndexGuard<'_> {
    /// Returns true once a refresh has succeeded
    pub fn is_ready(&self) -> bool {
        self.state.ready
    }

    /// Resolves a ticker while the guard is held
    pub fn lookup(&self, symbol: &str) -> Result<&str, TickerError> {
        self.state.lookup(symbol)
    }
}

impl SymbolIndex {
    /// Creates an empty, not-ready index fed by `catalog`
    pub fn new(catalog: Arc<dyn PriceProvider>) -> Self {
        Self {
            catalog,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Fetches the full catalog and swaps in a fresh mapping
    ///
    /// The write lock is held from fetch to swap, so no price run can
    /// interleave with a refresh. Returns the number of distinct symbols.
    pub async fn refresh(&self) -> Result<usize, TickerError> {
        tracing::debug!("Locking symbol index for refresh");
        let mut state = self.state.write().await;

        tracing::debug!(
            provider = self.catalog.provider_name(),
            "Fetching coin catalog"
        );
        let listing = self.catalog.fetch_coin_list().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to refresh symbol index, keeping previous mapping");
            TickerError::from(e)
        })?;

        let mapping = build_mapping(&listing);
        let size = mapping.len();

        *state = IndexState {
            mapping,
            ready: true,
            refreshed_at: Some(Utc::now()),
        };

        tracing::info!(
            listings = listing.len(),
            symbols = size,
            "Symbol index refreshed"
        );

        Ok(size)
    }

    /// Resolves a ticker to its provider id
    pub async fn lookup(&self, symbol: &str) -> Result<String, TickerError> {
        let state = self.state.read().await;
        state.lookup(symbol).map(str::to_string)
    }

    /// Takes the index exclusively until the guard is dropped
    pub async fn lock_exclusive(&self) -> IndexGuard<'_> {
        IndexGuard {
            state: self.state.write().await,
        }
    }

    /// Returns true once a refresh has succeeded
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    /// Number of distinct symbols currently indexed
    pub async fn len(&self) -> usize {
        self.state.read().await.mapping.len()
    }

    /// When the current mapping was built
    pub async fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.refreshed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::mock::MockPriceProvider;

    fn listing() -> Vec<CoinListing> {
        vec![
            CoinListing::new("bitcoin", "BTC", "Bitcoin"),
            CoinListing::new("ethereum", "eth", "Ethereum"),
            CoinListing::new("binancecoin", "bnb", "BNB"),
        ]
    }

    #[test]
    fn test_build_mapping_last_duplicate_wins() {
        let mapping = build_mapping(&[
            CoinListing::new("bitcoin", "btc", "Bitcoin"),
            CoinListing::new("bitcoin-token", "BTC", "Bitcoin Token"),
        ]);

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["btc"], "bitcoin-token");
    }

    #[tokio::test]
    async fn test_refresh_indexes_lowercased_symbols() {
        let provider = Arc::new(MockPriceProvider::new());
        provider.push_listing(listing());
        let index = SymbolIndex::new(provider.clone());

        assert_eq!(index.refresh().await.unwrap(), 3);
        assert!(index.is_ready().await);
        assert_eq!(index.lookup("btc").await.unwrap(), "bitcoin");
        assert_eq!(index.lookup("BTC").await.unwrap(), "bitcoin");
        assert_eq!(index.lookup("eth").await.unwrap(), "ethereum");
        assert!(index.refreshed_at().await.is_some());
    }

    #[tokio::test]
    async fn test_lookup_before_refresh_is_not_ready() {
        let index = SymbolIndex::new(Arc::new(MockPriceProvider::new()));

        assert!(!index.is_ready().await);
        assert!(matches!(index.lookup("btc").await, Err(TickerError::NotReady)));
        assert!(!index.lock_exclusive().await.is_ready());
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_resolution_miss() {
        let provider = Arc::new(MockPriceProvider::new());
        provider.push_listing(listing());
        let index = SymbolIndex::new(provider);
        index.refresh().await.unwrap();

        match index.lookup("doge").await {
            Err(TickerError::ResolutionMiss { symbol }) => assert_eq!(symbol, "doge"),
            other => panic!("expected resolution miss, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_mapping() {
        let provider = Arc::new(MockPriceProvider::new());
        provider.push_listing(listing());
        provider.push_listing_error(ProviderError::RateLimitExceeded);
        let index = SymbolIndex::new(provider.clone());

        index.refresh().await.unwrap();
        let err = index.refresh().await.unwrap_err();

        assert!(matches!(err, TickerError::Upstream(ProviderError::RateLimitExceeded)));
        assert!(index.is_ready().await);
        assert_eq!(index.len().await, 3);
        assert_eq!(index.lookup("bnb").await.unwrap(), "binancecoin");
        assert_eq!(provider.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_first_refresh_stays_not_ready() {
        let provider = Arc::new(MockPriceProvider::new());
        provider.push_listing_error(ProviderError::Timeout);
        let index = SymbolIndex::new(provider);

        assert!(index.refresh().await.is_err());
        assert!(!index.is_ready().await);
        assert_eq!(index.len().await, 0);
    }

    #[tokio::test]
    async fn test_refresh_replaces_mapping_wholesale() {
        let provider = Arc::new(MockPriceProvider::new());
        provider.push_listing(listing());
        provider.push_listing(vec![CoinListing::new("solana", "sol", "Solana")]);
        let index = SymbolIndex::new(provider);

        index.refresh().await.unwrap();
        index.refresh().await.unwrap();

        assert_eq!(index.lookup("sol").await.unwrap(), "solana");
        assert!(matches!(
            index.lookup("btc").await,
            Err(TickerError::ResolutionMiss { .. })
        ));
    }

    #[tokio::test]
    async fn test_guard_lookup() {
        let provider = Arc::new(MockPriceProvider::new());
        provider.push_listing(listing());
        let index = SymbolIndex::new(provider);
        index.refresh().await.unwrap();

        let guard = index.lock_exclusive().await;
        assert!(guard.is_ready());
        assert_eq!(guard.lookup("Eth").unwrap(), "ethereum");
    }
}
