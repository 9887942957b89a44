//! Fetch-format-publish pipelines for the price and gas tickers

pub mod gas;
pub mod price;

pub use gas::GasUpdater;
pub use price::{PriceRunSummary, PriceUpdater};

use crate::{error::GatewayError, sessions::SessionPool};

/// Sets nickname (scoped to `guild_id`) then status for one bot
pub(crate) async fn publish(
    sessions: &SessionPool,
    credential: &str,
    guild_id: &str,
    nickname: &str,
    status: &str,
) -> Result<(), GatewayError> {
    let session = sessions.get_or_create(credential).await?;

    tracing::debug!(guild_id, nickname, "Changing nickname");
    session.set_nickname(guild_id, nickname).await?;

    tracing::debug!(status, "Changing status");
    session.set_status(status).await?;

    Ok(())
}
