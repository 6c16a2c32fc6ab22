//! Dispatcher schema and handler chain builders

use funnelcore::{ContactPayload, MenuAction};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message};

use super::types::{HandlerDeps, HandlerError, funnel_user};
use crate::core::metrics;
use crate::telegram::bot::parse_start;
use crate::telegram::keyboards::CLAIM_CALLBACK;
use crate::telegram::notifications::deliver;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same schema is used in production and in integration tests.
/// Branch order matters: `/start`, contacts and menu labels are matched
/// before the catch-all text branch.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(start_handler(deps.clone()))
        .branch(contact_handler(deps.clone()))
        .branch(menu_handler(deps.clone()))
        .branch(text_handler(deps.clone()))
        .branch(callback_handler(deps))
}

/// `/start` with an optional referral deep-link parameter
fn start_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private() && msg.text().and_then(parse_start).is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let user = funnel_user(msg.chat.id);
                let param = msg.text().and_then(parse_start).flatten();
                metrics::record_event("first_contact");

                let outbound = deps.engine.on_first_contact(user, param);
                deliver(&bot, &deps, outbound).await;
                Ok(())
            }
        })
}

/// Shared contact (identity confirmation)
fn contact_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private() && msg.contact().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let user = funnel_user(msg.chat.id);
                let payload = msg
                    .contact()
                    .and_then(|c| ContactPayload::new(c.phone_number.clone(), c.first_name.clone(), c.last_name.clone()));
                if payload.is_none() {
                    log::warn!("Contact from user {} carried no phone number", user);
                }
                metrics::record_event("contact");

                let outbound = deps.engine.on_identity_confirmed(user, payload);
                deliver(&bot, &deps, outbound).await;
                Ok(())
            }
        })
}

/// Action menu buttons (Balance / Withdraw / Referral Link / Bonus)
fn menu_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .filter_map(|msg: Message| msg.text().and_then(|text| text.trim().parse::<MenuAction>().ok()))
        .endpoint(move |bot: Bot, msg: Message, action: MenuAction| {
            let deps = deps.clone();
            async move {
                let user = funnel_user(msg.chat.id);
                log::info!("User {} chose {}", user, action.kind());
                metrics::record_event("menu");

                let outbound = deps.engine.on_menu_action(user, action);
                deliver(&bot, &deps, outbound).await;
                Ok(())
            }
        })
}

/// Any other text: a withdrawal identifier or a stray message
fn text_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private() && msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let user = funnel_user(msg.chat.id);
                let text = msg.text().unwrap_or_default();
                metrics::record_event("text");

                let outbound = deps.engine.on_text(user, text);
                deliver(&bot, &deps, outbound).await;
                Ok(())
            }
        })
}

/// Inline "Claim" button
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query: {}", e);
            }

            match q.data.as_deref() {
                Some(CLAIM_CALLBACK) => {
                    let user = funnel_user(ChatId::from(q.from.id));
                    metrics::record_event("claim");

                    let outbound = deps.engine.on_claim(user);
                    deliver(&bot, &deps, outbound).await;
                }
                other => log::debug!("Ignoring callback data {:?} from user {}", other, q.from.id),
            }
            Ok(())
        }
    })
}
