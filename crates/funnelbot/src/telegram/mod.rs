//! Telegram adapter: turns updates into funnel events and notices into messages

pub mod bot;
pub mod handlers;
pub mod keyboards;
pub mod notifications;
pub mod texts;

pub use bot::{Command, create_bot, setup_bot_commands};
pub use handlers::{HandlerDeps, HandlerError, schema};
pub use keyboards::JoinLinks;
