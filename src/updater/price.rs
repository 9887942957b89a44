//! Price ticker: one nickname/status pair per configured coin

use crate::{
    config::CoinConfig,
    error::TickerError,
    index::SymbolIndex,
    provider::PriceProvider,
    sessions::SessionPool,
    updater::publish,
};
use std::sync::Arc;

/// Display prefix for a currency code
pub fn currency_symbol(currency: &str) -> &'static str {
    match currency {
        "usd" => "$",
        "idr" => "RP.",
        _ => "$",
    }
}

/// Nickname such as `btc $12345.68`
pub fn format_nickname(coin_id: &str, currency: &str, price: f64, decimals: usize) -> String {
    format!(
        "{} {}{:.*}",
        coin_id,
        currency_symbol(currency),
        decimals,
        price
    )
}

/// Status such as `24H: -1.23%`
pub fn format_status(change_24h: f64) -> String {
    format!("24H: {:.2}%", change_24h)
}

/// Outcome of a price run that reached the end of the coin list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceRunSummary {
    /// Coins whose nickname and status were published
    pub published: Vec<String>,
    /// Coins skipped because of a resolution miss or upstream failure
    pub skipped: Vec<String>,
}

/// Publishes every configured coin's price to its bot
pub struct PriceUpdater {
    coins: Vec<CoinConfig>,
    index: Arc<SymbolIndex>,
    sessions: Arc<SessionPool>,
    provider: Arc<dyn PriceProvider>,
}

impl PriceUpdater {
    pub fn new(
        coins: Vec<CoinConfig>,
        index: Arc<SymbolIndex>,
        sessions: Arc<SessionPool>,
        provider: Arc<dyn PriceProvider>,
    ) -> Self {
        Self {
            coins,
            index,
            sessions,
            provider,
        }
    }

    /// Runs one pass over the coin list
    ///
    /// Holds the symbol index exclusively for the whole pass. Resolution and
    /// fetch failures skip the coin; a publish failure aborts the pass.
    pub async fn run(&self) -> Result<PriceRunSummary, TickerError> {
        let index = self.index.lock_exclusive().await;
        if !index.is_ready() {
            tracing::error!("Symbol index is not initialized yet");
            return Err(TickerError::NotReady);
        }

        let mut summary = PriceRunSummary::default();

        for coin in &self.coins {
            tracing::debug!(coin = %coin.id, "Trying to update coin");

            let provider_id = match &coin.coingecko_id {
                Some(id) => id.clone(),
                None => match index.lookup(&coin.id) {
                    Ok(id) => id.to_string(),
                    Err(e) => {
                        tracing::error!(coin = %coin.id, error = %e, "Failed to find provider id");
                        summary.skipped.push(coin.id.clone());
                        continue;
                    }
                },
            };

            let currency = coin.currency();
            let snapshot = match self.provider.fetch_price(&provider_id, &currency).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(
                        coin = %coin.id,
                        provider_id = %provider_id,
                        error = %e,
                        "Failed to fetch price"
                    );
                    summary.skipped.push(coin.id.clone());
                    continue;
                }
            };
            tracing::debug!(
                coin = %coin.id,
                provider_id = %provider_id,
                price = snapshot.price,
                change_24h = snapshot.change_24h,
                fetched_at = %snapshot.fetched_at,
                "Fetched price"
            );

            let nickname =
                format_nickname(&coin.id, &currency, snapshot.price, coin.decimal_place);
            let status = format_status(snapshot.change_24h);

            if let Err(e) = publish(
                &self.sessions,
                &coin.discord_bot_key,
                &coin.guild_id,
                &nickname,
                &status,
            )
            .await
            {
                tracing::error!(coin = %coin.id, error = %e, "Failed to update Discord bot");
                return Err(e.into());
            }

            summary.published.push(coin.id.clone());
        }

        tracing::info!(
            published = summary.published.len(),
            skipped = summary.skipped.len(),
            "Price ticker updated"
        );

        Ok(summary)
    }
}
