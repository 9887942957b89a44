use coin_ticker_bot::{logging, Config, TickerCore};
use rustls::crypto::{ring, CryptoProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // rustls >= 0.23 needs a process-wide provider before any TLS handshake
    if CryptoProvider::install_default(ring::default_provider()).is_err() {
        anyhow::bail!("failed to install rustls CryptoProvider");
    }

    logging::init_from_env();

    tracing::info!("Loading configuration");
    let path = Config::resolve_path()?;
    let config = Config::load(&path)?;
    tracing::info!(
        path = %path.display(),
        coins = config.price_ticker_config.coin_list.len(),
        "Configuration loaded"
    );

    tracing::info!("Initializing ticker core");
    let core = TickerCore::new(config)?;

    // Not fatal: price runs report NotReady until the hourly job succeeds
    if let Err(e) = core.refresh_index().await {
        tracing::warn!(error = %e, "Initial symbol index refresh failed");
    }

    let health = core.health_check().await;
    tracing::info!(status = ?health.status, message = ?health.message, "Startup health");

    let scheduler = core.scheduler().start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    scheduler.shutdown();

    Ok(())
}
