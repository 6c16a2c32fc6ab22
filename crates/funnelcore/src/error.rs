use thiserror::Error;

/// Why a referral parameter was not accepted.
///
/// These never reach the user as failures: a rejected referral simply means the
/// first contact is recorded without attribution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferralError {
    /// Parameter present but blank
    #[error("referral parameter is empty")]
    Empty,

    /// Parameter is not a plain decimal id
    #[error("referral parameter is not a numeric id: {0}")]
    NotNumeric(String),

    /// Zero or negative id
    #[error("referral id must be positive, got {0}")]
    NonPositive(i64),

    /// The user tried to refer themselves
    #[error("user cannot refer themselves")]
    SelfReferral,

    /// The referrer's own referral chain leads back to the user
    #[error("referrer {0} is already downstream of this user")]
    Cycle(i64),

    /// Referrals are only taken from the very first contact
    #[error("user already contacted the bot before")]
    NotFirstContact,

    /// A referrer is already on record
    #[error("user is already attributed to referrer {0}")]
    AlreadyAttributed(i64),
}

/// Withdrawal identifier validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WithdrawalIdError {
    #[error("withdrawal identifier is empty")]
    Empty,

    #[error("withdrawal identifier must contain '@': {0}")]
    MissingAt(String),
}
