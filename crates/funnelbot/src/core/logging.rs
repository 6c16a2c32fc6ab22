//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A configuration summary logged once at startup

use anyhow::Result;
use secrecy::ExposeSecret;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup
///
/// Secrets are never printed, only whether they are set.
pub fn log_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("⚙️  Funnel Bot Configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if config::BOT_TOKEN.expose_secret().is_empty() {
        log::error!("❌ BOT_TOKEN: not set (also checked TELOXIDE_TOKEN)");
    } else {
        log::info!("✅ BOT_TOKEN: set");
    }

    match *config::OPERATOR_CHAT_ID {
        Some(id) => log::info!("✅ OPERATOR_CHAT_ID: {}", id),
        None => {
            log::warn!("⚠️  OPERATOR_CHAT_ID: not set");
            log::warn!("   Contact captures and withdrawal requests will NOT be forwarded!");
        }
    }

    match config::WEBHOOK_URL.as_deref() {
        Some(url) => log::info!("🌐 WEBHOOK_URL: {}", url),
        None => log::info!("🌐 WEBHOOK_URL: not set (long polling only)"),
    }

    log::info!("🔌 PORT: {}", *config::PORT);
    log::info!("📢 Join channel: {}", *config::JOIN_CHANNEL_URL);
    log::info!("👥 Join group: {}", *config::JOIN_GROUP_URL);
    log::info!(
        "💰 Bonus: {}{} | Referral: {}{}",
        *config::CURRENCY_SYMBOL,
        *config::BONUS_AMOUNT,
        *config::CURRENCY_SYMBOL,
        *config::REFERRAL_AMOUNT
    );
    log::info!("📝 Log file: {}", *config::LOG_FILE_PATH);
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("funnelbot.log");

        init_logger(path.to_str().unwrap()).unwrap();
        log::info!("logger test line");

        assert!(path.exists());
    }
}
