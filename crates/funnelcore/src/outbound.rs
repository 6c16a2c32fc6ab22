//! What the engine asks the transport to send
//!
//! The engine never formats chat text. It emits [`Notice`]s addressed to a
//! [`Recipient`], and the adapter renders each notice (text + optional keyboard)
//! for its transport.

use crate::types::{ContactPayload, UserId};

/// Who a notice is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    User(UserId),
    /// The fixed operator chat that receives contact captures and withdrawal requests
    Operator,
}

/// Interactive options attached to a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Links to the required channel and group plus the inline "Claim" button
    JoinAndClaim,
    /// A single button that shares the user's contact
    ShareContact,
    /// Balance / Withdraw / Referral Link / Bonus
    ActionMenu,
}

/// A single message the engine wants delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Welcome,
    /// First claim click: join the channels, then click again
    JoinRequired,
    /// Second claim click: please share your contact
    ShareContact,
    /// A contact-confirmation event arrived without a usable contact
    ContactRequired,
    /// Contact arrived before the claim steps were done
    ClaimFirst,
    ContactSaved,
    AlreadyVerified,
    /// "Choose an option" with the action menu keyboard
    ActionMenu,
    /// Bonus or withdrawal attempted before the contact step
    VerificationRequired,
    Balance {
        balance: u64,
    },
    ReferralLink {
        link: String,
    },
    AskWithdrawalId,
    InvalidWithdrawalId,
    WithdrawalAccepted {
        amount: u64,
    },
    BonusGranted {
        amount: u64,
    },
    BalanceUpdated {
        balance: u64,
    },
    BonusAlreadyClaimed,
    /// Sent to the referrer when a referred user's bonus fires
    ReferralCredited {
        amount: u64,
        balance: u64,
        referred: UserId,
    },
    UseMenu,
    /// Operator: a user shared their contact
    ContactCaptured {
        user: UserId,
        contact: ContactPayload,
    },
    /// Operator: a user asked to withdraw
    WithdrawalRequested {
        user: UserId,
        identifier: String,
        amount: u64,
        referrals: u64,
        contact: Option<ContactPayload>,
    },
}

impl Notice {
    /// Keyboard rendered together with the notice, if any.
    pub fn keyboard(&self) -> Option<Keyboard> {
        match self {
            Notice::Welcome => Some(Keyboard::JoinAndClaim),
            Notice::ShareContact | Notice::ContactRequired => Some(Keyboard::ShareContact),
            Notice::ActionMenu => Some(Keyboard::ActionMenu),
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Notice::Welcome => "welcome",
            Notice::JoinRequired => "join_required",
            Notice::ShareContact => "share_contact",
            Notice::ContactRequired => "contact_required",
            Notice::ClaimFirst => "claim_first",
            Notice::ContactSaved => "contact_saved",
            Notice::AlreadyVerified => "already_verified",
            Notice::ActionMenu => "action_menu",
            Notice::VerificationRequired => "verification_required",
            Notice::Balance { .. } => "balance",
            Notice::ReferralLink { .. } => "referral_link",
            Notice::AskWithdrawalId => "ask_withdrawal_id",
            Notice::InvalidWithdrawalId => "invalid_withdrawal_id",
            Notice::WithdrawalAccepted { .. } => "withdrawal_accepted",
            Notice::BonusGranted { .. } => "bonus_granted",
            Notice::BalanceUpdated { .. } => "balance_updated",
            Notice::BonusAlreadyClaimed => "bonus_already_claimed",
            Notice::ReferralCredited { .. } => "referral_credited",
            Notice::UseMenu => "use_menu",
            Notice::ContactCaptured { .. } => "contact_captured",
            Notice::WithdrawalRequested { .. } => "withdrawal_requested",
        }
    }
}

/// A notice plus its recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    pub recipient: Recipient,
    pub notice: Notice,
}

impl Outbound {
    pub fn to_user(user: UserId, notice: Notice) -> Self {
        Self {
            recipient: Recipient::User(user),
            notice,
        }
    }

    pub fn to_operator(notice: Notice) -> Self {
        Self {
            recipient: Recipient::Operator,
            notice,
        }
    }
}
