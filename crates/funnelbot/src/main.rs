use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::update_listeners::{Polling, webhooks};
use tokio::net::TcpListener;
use tokio::time::sleep;

use funnelbot::cli::{Cli, Commands};
use funnelbot::core::{config, logging, metrics, web_server};
use funnelbot::telegram::{HandlerDeps, HandlerError, JoinLinks, create_bot, schema, setup_bot_commands};
use funnelcore::FunnelConfig;

/// Main entry point for the Telegram funnel bot
///
/// # Errors
/// Returns an error if initialization fails (logging, configuration, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics from handler tasks instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // .env first so LOG_FILE_PATH can come from it
    let _ = dotenv();

    logging::init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { webhook }) => {
            log::info!("Running bot (webhook: {})", webhook);
            run_bot(webhook).await
        }
        Some(Commands::CheckConfig) => {
            logging::log_configuration();
            Ok(())
        }
        None => {
            let webhook = config::WEBHOOK_URL.is_some();
            log::info!("No command specified, running bot (webhook: {})", webhook);
            run_bot(webhook).await
        }
    }
}

/// Run the Telegram bot
async fn run_bot(use_webhook: bool) -> Result<()> {
    let bot_init_start = std::time::Instant::now();
    log::info!("Starting bot...");

    metrics::init_metrics();
    logging::log_configuration();

    let bot = create_bot()?;

    // Retry while the Bot API is unreachable
    let bot_info = {
        let mut startup_retry = 0;
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    let is_retryable = matches!(
                        e,
                        teloxide::RequestError::Network(_)
                            | teloxide::RequestError::Io(_)
                            | teloxide::RequestError::RetryAfter(_)
                    );
                    startup_retry += 1;
                    if startup_retry >= config::retry::STARTUP_MAX_RETRIES || !is_retryable {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Bot API after {} attempts: {}",
                            startup_retry,
                            e
                        ));
                    }
                    log::warn!(
                        "Bot API not ready (attempt {}/{}): {}. Retrying...",
                        startup_retry,
                        config::retry::STARTUP_MAX_RETRIES,
                        e
                    );
                    sleep(config::retry::startup_delay()).await;
                }
            }
        }
    };
    let bot_username = bot_info
        .user
        .username
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Bot account has no username, referral links cannot be built"))?;
    log::info!("Bot username: @{}, Bot ID: {}", bot_username, bot_info.user.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let funnel_config =
        FunnelConfig::for_bot(&bot_username)?.with_amounts(*config::BONUS_AMOUNT, *config::REFERRAL_AMOUNT);
    let deps = HandlerDeps::in_memory(
        funnel_config,
        config::OPERATOR_CHAT_ID.map(ChatId),
        JoinLinks::from_config()?,
        config::CURRENCY_SYMBOL.as_str(),
    );
    let handler = schema(deps);

    log::info!("================================================");
    log::info!("🎉 Bot initialization complete in {:.2}s", bot_init_start.elapsed().as_secs_f64());
    log::info!("================================================");

    if use_webhook {
        run_webhook(bot, handler).await
    } else {
        run_polling(bot, handler).await
    }
}

/// Webhook mode: Telegram updates and the health/metrics routes share one port
async fn run_webhook(bot: Bot, handler: UpdateHandler<HandlerError>) -> Result<()> {
    let url = config::WEBHOOK_URL
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Webhook mode requires WEBHOOK_URL or RENDER_EXTERNAL_URL"))?;
    let url = url::Url::parse(&url)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], *config::PORT));
    log::info!("Starting bot in webhook mode at {} (listening on {})", url, addr);

    let options = webhooks::Options::new(addr, url);
    let (listener, stop_flag, router) = webhooks::axum_to_router(bot.clone(), options).await?;
    let app = router.merge(web_server::routes());

    let tcp_listener = TcpListener::bind(addr).await?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(tcp_listener, app).with_graceful_shutdown(stop_flag).await {
            log::error!("Web server error: {}", e);
        }
    });

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

/// Long polling mode, with the health/metrics routes on their own listener
async fn run_polling(bot: Bot, handler: UpdateHandler<HandlerError>) -> Result<()> {
    log::info!("Starting bot in long polling mode");

    let port = *config::PORT;
    tokio::spawn(async move {
        if let Err(e) = web_server::start_web_server(port).await {
            log::error!("Web server error: {}", e);
        }
    });

    let mut retry_count = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // Separate task so a dispatcher panic surfaces through the JoinHandle
        let handle = tokio::spawn(async move {
            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= config::retry::MAX_DISPATCHER_RETRIES {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                log::info!(
                    "Restarting dispatcher (attempt {}/{})...",
                    retry_count,
                    config::retry::MAX_DISPATCHER_RETRIES
                );
                sleep(config::retry::dispatcher_delay() * retry_count).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }
    }

    Ok(())
}
