//! Configuration for the bot, read once from the environment

use std::env;
use std::sync::LazyLock;
use std::time::Duration;

use secrecy::SecretString;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: LazyLock<SecretString> = LazyLock::new(|| {
    SecretString::from(
        env::var("BOT_TOKEN")
            .or_else(|_| env::var("TELOXIDE_TOKEN"))
            .unwrap_or_default(),
    )
});

/// Chat that receives contact captures and withdrawal requests
/// Read from OPERATOR_CHAT_ID (YOUR_CHAT_ID is accepted for older deployments)
/// If unset, operator notifications are dropped with a warning
pub static OPERATOR_CHAT_ID: LazyLock<Option<i64>> = LazyLock::new(|| {
    env::var("OPERATOR_CHAT_ID")
        .or_else(|_| env::var("YOUR_CHAT_ID"))
        .ok()
        .and_then(|v| parse_chat_id(&v))
});

/// Public webhook URL for Telegram updates
/// Read from WEBHOOK_URL, or derived from RENDER_EXTERNAL_URL as https://<host>/webhook
pub static WEBHOOK_URL: LazyLock<Option<String>> = LazyLock::new(|| {
    env::var("WEBHOOK_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            env::var("RENDER_EXTERNAL_URL")
                .ok()
                .and_then(|host| webhook_url_from_external(&host))
        })
});

/// HTTP port for the webhook, liveness and metrics routes
/// Read from PORT environment variable
/// Default: 5000
pub static PORT: LazyLock<u16> = LazyLock::new(|| env_or("PORT", 5000));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: LazyLock<String> =
    LazyLock::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Channel users must join before claiming
pub static JOIN_CHANNEL_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("JOIN_CHANNEL_URL").unwrap_or_else(|_| "https://t.me/Free_google_play_redeem_code1".to_string())
});

/// Group users must join before claiming
pub static JOIN_GROUP_URL: LazyLock<String> =
    LazyLock::new(|| env::var("JOIN_GROUP_URL").unwrap_or_else(|_| "https://t.me/redeem_code_chat".to_string()));

/// Credit granted with the one-time bonus
pub static BONUS_AMOUNT: LazyLock<u64> = LazyLock::new(|| env_or("BONUS_AMOUNT", funnelcore::DEFAULT_BONUS_AMOUNT));

/// Credit granted to a referrer when a referred user claims their bonus
pub static REFERRAL_AMOUNT: LazyLock<u64> =
    LazyLock::new(|| env_or("REFERRAL_AMOUNT", funnelcore::DEFAULT_REFERRAL_AMOUNT));

/// Symbol shown in front of balances
pub static CURRENCY_SYMBOL: LazyLock<String> =
    LazyLock::new(|| env::var("CURRENCY_SYMBOL").unwrap_or_else(|_| "₹".to_string()));

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum number of retries for dispatcher reconnection
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher retry attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    /// Dispatcher retry delay duration
    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }

    /// How many times to wait for the Bot API on startup
    pub const STARTUP_MAX_RETRIES: u32 = 60;

    /// Delay between startup attempts (in seconds)
    pub const STARTUP_RETRY_DELAY_SECS: u64 = 5;

    pub fn startup_delay() -> Duration {
        Duration::from_secs(STARTUP_RETRY_DELAY_SECS)
    }
}

/// Parses an environment variable, falling back to `default` when unset or invalid.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Invalid {} value {:?}, using default", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Parses a Telegram chat id. Group and channel ids are negative, so any non-zero
/// integer is accepted.
pub fn parse_chat_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id != 0)
}

/// Builds the webhook URL from a Render-style external URL or bare host.
pub fn webhook_url_from_external(external: &str) -> Option<String> {
    let host = external
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    if host.is_empty() {
        return None;
    }
    Some(format!("https://{}/webhook", host))
}
