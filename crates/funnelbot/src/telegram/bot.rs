//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - `/start` deep-link parsing

use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the bot and claim your bonus")]
    Start,
}

/// Creates a Bot instance with custom or default API URL
///
/// The token comes from BOT_TOKEN (or TELOXIDE_TOKEN).
pub fn create_bot() -> AppResult<Bot> {
    let token = config::BOT_TOKEN.expose_secret();
    if token.is_empty() {
        return Err(AppError::Config(
            "BOT_TOKEN is not set (also checked TELOXIDE_TOKEN)".to_string(),
        ));
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(token, client);

    // Check if local Bot API server is configured
    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        bot.set_api_url(url::Url::parse(&bot_api_url)?)
    } else {
        bot
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

/// Parses a `/start` command.
///
/// Returns `None` when `text` is not `/start`, otherwise the deep-link parameter
/// if one was given. Accepts the `/start@botname` form used in groups.
pub fn parse_start(text: &str) -> Option<Option<&str>> {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let command = parts.next()?;
    let command = command.split('@').next().unwrap_or(command);
    if !command.eq_ignore_ascii_case("/start") {
        return None;
    }
    Some(parts.next().map(str::trim).filter(|p| !p.is_empty()))
}
