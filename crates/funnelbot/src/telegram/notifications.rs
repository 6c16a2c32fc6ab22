//! Delivery of engine notices to Telegram chats
//!
//! Delivery is best effort: a failed send is logged and counted, and the
//! remaining notices of the same event are still attempted. Ledger and funnel
//! state are never rolled back because a message could not be sent.

use funnelcore::{Outbound, Recipient};
use teloxide::prelude::*;
use teloxide::types::{ChatId, LinkPreviewOptions};

use crate::core::metrics;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::{keyboards, texts};

/// Sends every outbound notice in order.
pub async fn deliver(bot: &Bot, deps: &HandlerDeps, outbound: Vec<Outbound>) {
    for item in outbound {
        metrics::record_business_event(&item.notice);

        let Some(chat_id) = resolve_chat(deps, item.recipient) else {
            log::warn!(
                "Dropping {} notice: OPERATOR_CHAT_ID is not configured",
                item.notice.kind()
            );
            metrics::record_delivery_failure(&item.notice);
            continue;
        };

        match send_notice(bot, deps, chat_id, &item).await {
            Ok(_) => metrics::record_notice_sent(&item.notice),
            Err(e) => {
                log::error!("Failed to send {} notice to chat {}: {}", item.notice.kind(), chat_id, e);
                metrics::record_delivery_failure(&item.notice);
            }
        }
    }
}

fn resolve_chat(deps: &HandlerDeps, recipient: Recipient) -> Option<ChatId> {
    match recipient {
        Recipient::User(user) => Some(ChatId(user.0)),
        Recipient::Operator => deps.operator_chat,
    }
}

async fn send_notice(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    item: &Outbound,
) -> Result<Message, teloxide::RequestError> {
    let rendered = texts::render(&item.notice, &deps.currency);

    let mut request = bot.send_message(chat_id, rendered.text);
    if let Some(mode) = rendered.parse_mode {
        request = request.parse_mode(mode);
    }
    if let Some(keyboard) = item.notice.keyboard() {
        request = request.reply_markup(keyboards::render(keyboard, &deps.join_links));
    }
    if rendered.disable_link_preview {
        request = request.link_preview_options(LinkPreviewOptions {
            is_disabled: true,
            url: None,
            prefer_small_media: false,
            prefer_large_media: false,
            show_above_text: false,
        });
    }

    request.await
}
