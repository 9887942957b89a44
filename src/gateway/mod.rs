//! Chat gateway abstraction
//!
//! A [`Gateway`] turns a bot token into a long-lived [`ChatSession`]. The
//! session pool only ever sees these traits; the Discord implementation lives
//! in [`discord`].

pub mod discord;

use crate::error::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;

pub use discord::{DiscordGateway, DiscordSession};

/// A connected bot identity
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Sets the bot's own nickname in one guild
    async fn set_nickname(&self, guild_id: &str, nickname: &str) -> Result<(), GatewayError>;

    /// Sets the bot's "Listening to ..." status
    async fn set_status(&self, text: &str) -> Result<(), GatewayError>;
}

/// Factory for chat sessions
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Establishes a persistent session for a bot token
    async fn connect(&self, token: &str) -> Result<Arc<dyn ChatSession>, GatewayError>;
}
