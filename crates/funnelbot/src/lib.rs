//! Funnel bot - Telegram front end for the referral funnel
//!
//! # Module Structure
//!
//! - `core`: configuration, logging, errors, metrics, HTTP routes
//! - `telegram`: bot setup, dispatcher schema, keyboards, texts, delivery
//! - `cli`: command line interface
//!
//! Funnel rules and balances live in the `funnelcore` crate.

pub mod cli;
pub mod core;
pub mod telegram;

pub use crate::core::error::{AppError, AppResult};
pub use crate::core::{config, logging, metrics, web_server};
