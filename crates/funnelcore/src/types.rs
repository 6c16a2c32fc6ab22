//! Domain types shared by the stores and the funnel engine

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::ReferralError;

/// Opaque user identifier supplied by the chat transport.
///
/// For Telegram this is the id of the user's private chat with the bot, which is
/// also the value embedded in referral links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl UserId {
    /// Parses a referral parameter (the `/start` deep-link payload) into a user id.
    ///
    /// Only plain positive decimal ids are accepted. Anything else is rejected here,
    /// before it can reach the funnel store.
    ///
    /// # Examples
    /// ```
    /// use funnelcore::UserId;
    ///
    /// assert_eq!(UserId::parse_referral("12345").unwrap(), UserId(12345));
    /// assert!(UserId::parse_referral("abc").is_err());
    /// assert!(UserId::parse_referral("-5").is_err());
    /// ```
    pub fn parse_referral(param: &str) -> Result<Self, ReferralError> {
        let trimmed = param.trim();
        if trimmed.is_empty() {
            return Err(ReferralError::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ReferralError::NotNumeric(trimmed.to_string()));
        }
        let id: i64 = trimmed
            .parse()
            .map_err(|_| ReferralError::NotNumeric(trimmed.to_string()))?;
        if id <= 0 {
            return Err(ReferralError::NonPositive(id));
        }
        Ok(Self(id))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a user in the funnel.
///
/// Variants are declared in funnel order; the derived ordering is used for
/// "at least verified" style guards and stages never move backwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// First contact happened, nothing else yet.
    #[default]
    New,
    /// Claim clicked once; the user was told to join the channels and click again.
    ClaimRequested,
    /// Claim clicked again; waiting for the user to share their contact.
    ContactRequested,
    /// Contact shared; the action menu is unlocked.
    Verified,
    /// The one-time bonus has been granted.
    BonusClaimed,
}

impl Stage {
    /// Whether the action menu (bonus, withdrawal) is unlocked.
    pub fn is_verified(self) -> bool {
        self >= Stage::Verified
    }
}

/// Actions available from the reply-keyboard menu.
///
/// The string form is the exact button label shown to the user, so the adapter can
/// parse incoming text with `MenuAction::from_str`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
pub enum MenuAction {
    #[strum(serialize = "💰Balance")]
    Balance,
    #[strum(serialize = "✅Withdraw")]
    Withdraw,
    #[strum(serialize = "🙌Referral Link")]
    ReferralLink,
    #[strum(serialize = "🎁Bonus")]
    Bonus,
}

impl MenuAction {
    /// Metric/log label
    pub fn kind(self) -> &'static str {
        match self {
            MenuAction::Balance => "balance",
            MenuAction::Withdraw => "withdraw",
            MenuAction::ReferralLink => "referral_link",
            MenuAction::Bonus => "bonus",
        }
    }
}

/// Contact details shared by the user during identity confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPayload {
    pub phone: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl ContactPayload {
    /// Builds a payload, returning `None` when the phone number is blank.
    pub fn new(phone: impl Into<String>, first_name: impl Into<String>, last_name: Option<String>) -> Option<Self> {
        let phone = phone.into();
        if phone.trim().is_empty() {
            return None;
        }
        Some(Self {
            phone: phone.trim().to_string(),
            first_name: first_name.into(),
            last_name: last_name.filter(|l| !l.trim().is_empty()),
        })
    }

    /// "First Last", or just the first name.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}
