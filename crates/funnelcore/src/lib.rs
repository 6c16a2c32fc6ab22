//! Funnel core - referral funnel state machine and ledger (no Telegram)
//!
//! # Module Structure
//!
//! - `types`: user ids, funnel stages, menu actions, contact payloads
//! - `ledger`: per-user balance store
//! - `funnel`: per-user funnel progress store
//! - `engine`: the state machine driving users from first contact to withdrawal
//! - `outbound`: notices the engine asks the transport to deliver
//! - `error`: boundary validation errors

pub mod engine;
pub mod error;
pub mod funnel;
pub mod ledger;
pub mod outbound;
pub mod types;

pub use engine::{validate_withdrawal_id, FunnelConfig, FunnelEngine, DEFAULT_BONUS_AMOUNT, DEFAULT_REFERRAL_AMOUNT};
pub use error::{ReferralError, WithdrawalIdError};
pub use funnel::{FunnelState, FunnelStore, InMemoryFunnelStore};
pub use ledger::{InMemoryLedger, LedgerStore};
pub use outbound::{Keyboard, Notice, Outbound, Recipient};
pub use types::{ContactPayload, MenuAction, Stage, UserId};
