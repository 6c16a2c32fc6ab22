//! Handler types and dependencies

use std::sync::Arc;

use funnelcore::{FunnelConfig, FunnelEngine, InMemoryFunnelStore, InMemoryLedger, UserId};
use teloxide::types::ChatId;

use crate::telegram::keyboards::JoinLinks;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub engine: Arc<FunnelEngine>,
    /// Where contact captures and withdrawal requests go
    pub operator_chat: Option<ChatId>,
    pub join_links: JoinLinks,
    pub currency: String,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(
        engine: Arc<FunnelEngine>,
        operator_chat: Option<ChatId>,
        join_links: JoinLinks,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            operator_chat,
            join_links,
            currency: currency.into(),
        }
    }

    /// Dependencies backed by fresh in-memory stores
    pub fn in_memory(
        config: FunnelConfig,
        operator_chat: Option<ChatId>,
        join_links: JoinLinks,
        currency: impl Into<String>,
    ) -> Self {
        let engine = FunnelEngine::new(
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryFunnelStore::new()),
            config,
        );
        Self::new(Arc::new(engine), operator_chat, join_links, currency)
    }
}

/// Funnel user for a private chat. The bot only talks to users in private
/// chats, where the chat id equals the user id.
pub fn funnel_user(chat_id: ChatId) -> UserId {
    UserId(chat_id.0)
}
