//! Gas ticker: one bot showing Ethereum gas fees

use crate::{
    config::GasTickerConfig,
    error::TickerError,
    provider::GasProvider,
    sessions::SessionPool,
    types::GasSnapshot,
    updater::publish,
};
use std::sync::Arc;

/// Nickname such as `🚶42 gwei`
pub fn format_nickname(gas: &GasSnapshot) -> String {
    format!("🚶{} gwei", gas.average_gwei())
}

/// Status such as `⚡65 🐌12`
pub fn format_status(gas: &GasSnapshot) -> String {
    format!("⚡{} 🐌{}", gas.fast_gwei(), gas.safe_low_gwei())
}

/// Publishes the current gas fees to the configured bot
pub struct GasUpdater {
    config: GasTickerConfig,
    sessions: Arc<SessionPool>,
    provider: Arc<dyn GasProvider>,
}

impl GasUpdater {
    pub fn new(
        config: GasTickerConfig,
        sessions: Arc<SessionPool>,
        provider: Arc<dyn GasProvider>,
    ) -> Self {
        Self {
            config,
            sessions,
            provider,
        }
    }

    /// Fetches one snapshot and publishes it
    pub async fn run(&self) -> Result<(), TickerError> {
        let gas = self.provider.fetch_gas().await.map_err(|e| {
            tracing::error!(
                provider = self.provider.provider_name(),
                error = %e,
                "Failed to fetch gas"
            );
            TickerError::from(e)
        })?;

        let nickname = format_nickname(&gas);
        let status = format_status(&gas);

        publish(
            &self.sessions,
            &self.config.discord_bot_key,
            &self.config.guild_id,
            &nickname,
            &status,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to update Discord bot");
            TickerError::from(e)
        })?;

        tracing::info!(
            average = gas.average_gwei(),
            fast = gas.fast_gwei(),
            safe_low = gas.safe_low_gwei(),
            "Gas ticker updated"
        );

        Ok(())
    }
}
