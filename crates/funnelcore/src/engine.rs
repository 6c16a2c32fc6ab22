//! Funnel state machine
//!
//! The engine is pure decision logic over the [`LedgerStore`] and [`FunnelStore`]
//! contracts. Each `on_*` call applies one inbound event for one user and returns
//! the notices to deliver. Nothing here blocks or awaits, and no event leaves
//! state partially applied.
//!
//! Stage flow:
//!
//! ```text
//! New --claim--> ClaimRequested --claim--> ContactRequested --contact--> Verified --bonus--> BonusClaimed
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use url::Url;

use crate::error::{ReferralError, WithdrawalIdError};
use crate::funnel::{FunnelState, FunnelStore};
use crate::ledger::LedgerStore;
use crate::outbound::{Notice, Outbound};
use crate::types::{ContactPayload, MenuAction, Stage, UserId};

/// Default bonus credit for a verified user
pub const DEFAULT_BONUS_AMOUNT: u64 = 1;

/// Default credit for the referrer when a referred user's bonus fires
pub const DEFAULT_REFERRAL_AMOUNT: u64 = 1;

/// Engine settings that are not per-user state.
#[derive(Clone, Debug)]
pub struct FunnelConfig {
    pub bonus_amount: u64,
    pub referral_amount: u64,
    /// `https://t.me/<bot username>`, the base of referral links
    link_base: Url,
}

impl FunnelConfig {
    /// Config with default credit amounts for the bot with the given username.
    pub fn for_bot(bot_username: &str) -> Result<Self, url::ParseError> {
        let username = bot_username.trim().trim_start_matches('@');
        let link_base = Url::parse("https://t.me/")?.join(username)?;
        Ok(Self {
            bonus_amount: DEFAULT_BONUS_AMOUNT,
            referral_amount: DEFAULT_REFERRAL_AMOUNT,
            link_base,
        })
    }

    pub fn with_amounts(mut self, bonus_amount: u64, referral_amount: u64) -> Self {
        self.bonus_amount = bonus_amount;
        self.referral_amount = referral_amount;
        self
    }

    /// Deep link that starts the bot with `user` as the referral parameter.
    pub fn referral_link(&self, user: UserId) -> String {
        let mut url = self.link_base.clone();
        url.query_pairs_mut().append_pair("start", &user.to_string());
        url.into()
    }
}

/// Checks a withdrawal identifier. The only rule is that it contains `@`.
///
/// Returns the trimmed identifier.
pub fn validate_withdrawal_id(text: &str) -> Result<&str, WithdrawalIdError> {
    let id = text.trim();
    if id.is_empty() {
        return Err(WithdrawalIdError::Empty);
    }
    if !id.contains('@') {
        return Err(WithdrawalIdError::MissingAt(id.to_string()));
    }
    Ok(id)
}

/// The funnel state machine.
pub struct FunnelEngine {
    ledger: Arc<dyn LedgerStore>,
    funnel: Arc<dyn FunnelStore>,
    config: FunnelConfig,
}

impl FunnelEngine {
    pub fn new(ledger: Arc<dyn LedgerStore>, funnel: Arc<dyn FunnelStore>, config: FunnelConfig) -> Self {
        Self { ledger, funnel, config }
    }

    pub fn config(&self) -> &FunnelConfig {
        &self.config
    }

    pub fn balance(&self, user: UserId) -> u64 {
        self.ledger.get_balance(user)
    }

    pub fn snapshot(&self, user: UserId) -> Option<FunnelState> {
        self.funnel.snapshot(user)
    }

    /// Start of a conversation, optionally carrying a referral parameter.
    ///
    /// The referral is only recorded when this is the user's first contact with the
    /// bot, the parameter names another user, that user's referral chain does not
    /// lead back here, and no referrer is on record yet. The referrer does not have
    /// to be known to the bot.
    pub fn on_first_contact(&self, user: UserId, referral_param: Option<&str>) -> Vec<Outbound> {
        let first_contact = self.funnel.register(user);
        if first_contact {
            log::info!("New user {} (referral param: {:?})", user, referral_param);
        }

        if let Some(param) = referral_param.filter(|p| !p.trim().is_empty()) {
            match self.attribute_referral(user, param, first_contact) {
                Ok(referrer) => log::info!("User {} attributed to referrer {}", user, referrer),
                Err(e) => log::info!("Ignoring referral param {:?} for user {}: {}", param, user, e),
            }
        }

        vec![Outbound::to_user(user, Notice::Welcome)]
    }

    fn attribute_referral(&self, user: UserId, param: &str, first_contact: bool) -> Result<UserId, ReferralError> {
        if !first_contact {
            return Err(ReferralError::NotFirstContact);
        }
        let referrer = UserId::parse_referral(param)?;
        if referrer == user {
            return Err(ReferralError::SelfReferral);
        }
        if self.leads_back_to(referrer, user) {
            return Err(ReferralError::Cycle(referrer.0));
        }
        if !self.funnel.set_referrer_once(user, referrer) {
            let existing = self.funnel.get_referrer(user).map(|r| r.0).unwrap_or_default();
            return Err(ReferralError::AlreadyAttributed(existing));
        }
        Ok(referrer)
    }

    /// Walks the referrer chain starting at `from` looking for `user`.
    fn leads_back_to(&self, from: UserId, user: UserId) -> bool {
        let mut seen = HashSet::new();
        let mut current = from;
        while seen.insert(current) {
            match self.funnel.get_referrer(current) {
                Some(next) if next == user => return true,
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    /// Claim button. The first click always asks the user to join the channels;
    /// the next one asks for their contact.
    pub fn on_claim(&self, user: UserId) -> Vec<Outbound> {
        self.funnel.register(user);

        match self.funnel.get_stage(user) {
            Stage::New => {
                self.funnel.advance_stage(user, Stage::ClaimRequested);
                vec![Outbound::to_user(user, Notice::JoinRequired)]
            }
            Stage::ClaimRequested | Stage::ContactRequested => {
                self.funnel.advance_stage(user, Stage::ContactRequested);
                vec![Outbound::to_user(user, Notice::ShareContact)]
            }
            Stage::Verified | Stage::BonusClaimed => vec![
                Outbound::to_user(user, Notice::AlreadyVerified),
                Outbound::to_user(user, Notice::ActionMenu),
            ],
        }
    }

    /// Contact shared (or an attempt that carried no usable contact).
    pub fn on_identity_confirmed(&self, user: UserId, payload: Option<ContactPayload>) -> Vec<Outbound> {
        self.funnel.register(user);

        match self.funnel.get_stage(user) {
            Stage::New | Stage::ClaimRequested => vec![Outbound::to_user(user, Notice::ClaimFirst)],
            Stage::ContactRequested => match payload {
                Some(contact) => {
                    self.funnel.record_contact(user, contact.clone());
                    self.funnel.advance_stage(user, Stage::Verified);
                    log::info!("User {} verified via contact share", user);
                    vec![
                        Outbound::to_user(user, Notice::ContactSaved),
                        Outbound::to_user(user, Notice::ActionMenu),
                        Outbound::to_operator(Notice::ContactCaptured { user, contact }),
                    ]
                }
                None => vec![Outbound::to_user(user, Notice::ContactRequired)],
            },
            Stage::Verified | Stage::BonusClaimed => vec![Outbound::to_user(user, Notice::ActionMenu)],
        }
    }

    /// A reply-keyboard menu button. Choosing any action leaves the
    /// awaiting-withdrawal-identifier sub-state.
    pub fn on_menu_action(&self, user: UserId, action: MenuAction) -> Vec<Outbound> {
        self.funnel.register(user);
        self.funnel.set_awaiting_withdrawal(user, false);

        match action {
            MenuAction::Balance => vec![Outbound::to_user(
                user,
                Notice::Balance {
                    balance: self.ledger.get_balance(user),
                },
            )],
            MenuAction::ReferralLink => vec![Outbound::to_user(
                user,
                Notice::ReferralLink {
                    link: self.config.referral_link(user),
                },
            )],
            MenuAction::Withdraw => {
                if !self.funnel.get_stage(user).is_verified() {
                    return vec![Outbound::to_user(user, Notice::VerificationRequired)];
                }
                self.funnel.set_awaiting_withdrawal(user, true);
                vec![Outbound::to_user(user, Notice::AskWithdrawalId)]
            }
            MenuAction::Bonus => {
                if !self.funnel.get_stage(user).is_verified() {
                    return vec![Outbound::to_user(user, Notice::VerificationRequired)];
                }
                self.claim_bonus(user)
            }
        }
    }

    fn claim_bonus(&self, user: UserId) -> Vec<Outbound> {
        if !self.funnel.mark_bonus_received(user) {
            return vec![Outbound::to_user(user, Notice::BonusAlreadyClaimed)];
        }

        self.funnel.advance_stage(user, Stage::BonusClaimed);
        let balance = self.ledger.add(user, self.config.bonus_amount);
        log::info!("Bonus of {} granted to user {}", self.config.bonus_amount, user);

        let mut out = vec![
            Outbound::to_user(
                user,
                Notice::BonusGranted {
                    amount: self.config.bonus_amount,
                },
            ),
            Outbound::to_user(user, Notice::BalanceUpdated { balance }),
        ];

        if let Some(referrer) = self.funnel.get_referrer(user).filter(|r| *r != user) {
            let referrer_balance = self.ledger.add(referrer, self.config.referral_amount);
            let count = self.funnel.record_referral_credit(referrer);
            log::info!(
                "Added {} to referrer {}'s balance (referral #{} via user {})",
                self.config.referral_amount,
                referrer,
                count,
                user
            );
            out.push(Outbound::to_user(
                referrer,
                Notice::ReferralCredited {
                    amount: self.config.referral_amount,
                    balance: referrer_balance,
                    referred: user,
                },
            ));
        }

        out
    }

    /// Free text interpreted as a withdrawal identifier.
    ///
    /// Only meaningful while the user is in the awaiting-identifier sub-state; a
    /// malformed identifier keeps them there.
    pub fn on_withdrawal_identifier(&self, user: UserId, text: &str) -> Vec<Outbound> {
        self.funnel.register(user);

        if !self.funnel.get_stage(user).is_verified() {
            return vec![Outbound::to_user(user, Notice::VerificationRequired)];
        }
        if !self.funnel.is_awaiting_withdrawal(user) {
            return vec![
                Outbound::to_user(user, Notice::UseMenu),
                Outbound::to_user(user, Notice::ActionMenu),
            ];
        }

        let identifier = match validate_withdrawal_id(text) {
            Ok(id) => id.to_string(),
            Err(e) => {
                log::info!("Rejected withdrawal identifier from user {}: {}", user, e);
                return vec![Outbound::to_user(user, Notice::InvalidWithdrawalId)];
            }
        };

        self.funnel.set_awaiting_withdrawal(user, false);
        let amount = self.ledger.reset(user);
        let referrals = self.funnel.referral_count(user);
        log::info!("Withdrawal of {} requested by user {} to {}", amount, user, identifier);

        vec![
            Outbound::to_operator(Notice::WithdrawalRequested {
                user,
                identifier,
                amount,
                referrals,
                contact: self.funnel.get_contact(user),
            }),
            Outbound::to_user(user, Notice::WithdrawalAccepted { amount }),
            Outbound::to_user(user, Notice::ActionMenu),
        ]
    }

    /// Any other text from the user.
    pub fn on_text(&self, user: UserId, text: &str) -> Vec<Outbound> {
        self.funnel.register(user);

        // a menu label always wins, even over a pending withdrawal prompt
        if let Ok(action) = text.trim().parse::<MenuAction>() {
            return self.on_menu_action(user, action);
        }
        if self.funnel.is_awaiting_withdrawal(user) {
            return self.on_withdrawal_identifier(user, text);
        }

        match self.funnel.get_stage(user) {
            Stage::New | Stage::ClaimRequested => vec![Outbound::to_user(user, Notice::Welcome)],
            Stage::ContactRequested => self.on_identity_confirmed(user, None),
            Stage::Verified | Stage::BonusClaimed => vec![
                Outbound::to_user(user, Notice::UseMenu),
                Outbound::to_user(user, Notice::ActionMenu),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::InMemoryFunnelStore;
    use crate::ledger::InMemoryLedger;
    use crate::outbound::Recipient;
    use pretty_assertions::assert_eq;

    fn engine() -> FunnelEngine {
        FunnelEngine::new(
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryFunnelStore::new()),
            FunnelConfig::for_bot("test_bot").unwrap(),
        )
    }

    fn notices(out: &[Outbound]) -> Vec<&Notice> {
        out.iter().map(|o| &o.notice).collect()
    }

    fn verify(engine: &FunnelEngine, user: UserId) {
        engine.on_first_contact(user, None);
        engine.on_claim(user);
        engine.on_claim(user);
        engine.on_identity_confirmed(user, ContactPayload::new("+91000", "Test", None));
    }

    #[test]
    fn test_referral_link_embeds_user_id() {
        let config = FunnelConfig::for_bot("@my_bot").unwrap();
        assert_eq!(config.referral_link(UserId(42)), "https://t.me/my_bot?start=42");
    }

    #[test]
    fn test_validate_withdrawal_id() {
        assert_eq!(validate_withdrawal_id(" user@bank ").unwrap(), "user@bank");
        assert_eq!(validate_withdrawal_id("   "), Err(WithdrawalIdError::Empty));
        assert!(matches!(
            validate_withdrawal_id("not-an-id"),
            Err(WithdrawalIdError::MissingAt(_))
        ));
    }

    #[test]
    fn test_first_contact_sends_welcome() {
        let engine = engine();
        let out = engine.on_first_contact(UserId(1), None);
        assert_eq!(out, vec![Outbound::to_user(UserId(1), Notice::Welcome)]);
        assert_eq!(engine.snapshot(UserId(1)).unwrap().stage, Stage::New);
    }

    #[test]
    fn test_claim_then_contact_verifies_and_notifies_operator() {
        let engine = engine();
        let user = UserId(10);
        engine.on_first_contact(user, None);

        assert_eq!(notices(&engine.on_claim(user)), vec![&Notice::JoinRequired]);
        assert_eq!(notices(&engine.on_claim(user)), vec![&Notice::ShareContact]);
        // repeated second-step clicks keep asking for the contact
        assert_eq!(notices(&engine.on_claim(user)), vec![&Notice::ShareContact]);

        let contact = ContactPayload::new("+91555", "Ravi", Some("K".to_string())).unwrap();
        let out = engine.on_identity_confirmed(user, Some(contact.clone()));
        assert_eq!(
            out,
            vec![
                Outbound::to_user(user, Notice::ContactSaved),
                Outbound::to_user(user, Notice::ActionMenu),
                Outbound::to_operator(Notice::ContactCaptured { user, contact }),
            ]
        );
        assert_eq!(engine.snapshot(user).unwrap().stage, Stage::Verified);
    }

    #[test]
    fn test_contact_without_payload_is_re_requested() {
        let engine = engine();
        let user = UserId(11);
        engine.on_claim(user);
        engine.on_claim(user);
        assert_eq!(
            notices(&engine.on_identity_confirmed(user, None)),
            vec![&Notice::ContactRequired]
        );
        assert_eq!(engine.snapshot(user).unwrap().stage, Stage::ContactRequested);
    }

    #[test]
    fn test_contact_before_claim_is_not_accepted() {
        let engine = engine();
        let user = UserId(12);
        engine.on_first_contact(user, None);
        let out = engine.on_identity_confirmed(user, ContactPayload::new("+1", "A", None));
        assert_eq!(notices(&out), vec![&Notice::ClaimFirst]);
        assert_eq!(engine.snapshot(user).unwrap().stage, Stage::New);
        assert!(engine.snapshot(user).unwrap().contact.is_none());
    }

    #[test]
    fn test_claim_after_verification_shows_menu() {
        let engine = engine();
        let user = UserId(13);
        verify(&engine, user);
        assert_eq!(
            notices(&engine.on_claim(user)),
            vec![&Notice::AlreadyVerified, &Notice::ActionMenu]
        );
        assert_eq!(engine.snapshot(user).unwrap().stage, Stage::Verified);
    }

    #[test]
    fn test_bonus_and_withdraw_require_verification() {
        let engine = engine();
        let user = UserId(14);
        engine.on_first_contact(user, None);
        assert_eq!(
            notices(&engine.on_menu_action(user, MenuAction::Bonus)),
            vec![&Notice::VerificationRequired]
        );
        assert_eq!(
            notices(&engine.on_menu_action(user, MenuAction::Withdraw)),
            vec![&Notice::VerificationRequired]
        );
        assert_eq!(engine.balance(user), 0);
        assert!(!engine.snapshot(user).unwrap().bonus_received);
    }

    #[test]
    fn test_balance_and_link_available_any_time() {
        let engine = engine();
        let user = UserId(15);
        assert_eq!(
            notices(&engine.on_menu_action(user, MenuAction::Balance)),
            vec![&Notice::Balance { balance: 0 }]
        );
        assert_eq!(
            notices(&engine.on_menu_action(user, MenuAction::ReferralLink)),
            vec![&Notice::ReferralLink {
                link: "https://t.me/test_bot?start=15".to_string()
            }]
        );
    }

    #[test]
    fn test_bonus_with_configured_amounts() {
        let engine = FunnelEngine::new(
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryFunnelStore::new()),
            FunnelConfig::for_bot("test_bot").unwrap().with_amounts(5, 2),
        );
        let referrer = UserId(100);
        let user = UserId(101);
        engine.on_first_contact(referrer, None);
        engine.on_first_contact(user, Some("100"));
        verify(&engine, user);

        let out = engine.on_menu_action(user, MenuAction::Bonus);
        assert_eq!(
            out,
            vec![
                Outbound::to_user(user, Notice::BonusGranted { amount: 5 }),
                Outbound::to_user(user, Notice::BalanceUpdated { balance: 5 }),
                Outbound::to_user(
                    referrer,
                    Notice::ReferralCredited {
                        amount: 2,
                        balance: 2,
                        referred: user
                    }
                ),
            ]
        );
        assert_eq!(engine.snapshot(user).unwrap().stage, Stage::BonusClaimed);
    }

    #[test]
    fn test_withdraw_flow_and_awaiting_substate() {
        let engine = engine();
        let user = UserId(16);
        verify(&engine, user);
        engine.on_menu_action(user, MenuAction::Bonus);

        assert_eq!(
            notices(&engine.on_menu_action(user, MenuAction::Withdraw)),
            vec![&Notice::AskWithdrawalId]
        );
        assert!(engine.snapshot(user).unwrap().awaiting_withdrawal_id);

        // bad identifier keeps the sub-state and the balance
        assert_eq!(notices(&engine.on_text(user, "nope")), vec![&Notice::InvalidWithdrawalId]);
        assert!(engine.snapshot(user).unwrap().awaiting_withdrawal_id);
        assert_eq!(engine.balance(user), 1);

        let out = engine.on_text(user, "ravi@upi");
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].recipient, Recipient::Operator);
        assert!(matches!(
            &out[0].notice,
            Notice::WithdrawalRequested { amount: 1, referrals: 0, identifier, contact: Some(_), .. } if identifier == "ravi@upi"
        ));
        assert_eq!(out[1], Outbound::to_user(user, Notice::WithdrawalAccepted { amount: 1 }));
        assert_eq!(out[2], Outbound::to_user(user, Notice::ActionMenu));
        assert!(!engine.snapshot(user).unwrap().awaiting_withdrawal_id);
        assert_eq!(engine.balance(user), 0);
    }

    #[test]
    fn test_other_action_cancels_withdrawal_prompt() {
        let engine = engine();
        let user = UserId(17);
        verify(&engine, user);
        engine.on_menu_action(user, MenuAction::Withdraw);
        engine.on_menu_action(user, MenuAction::Balance);
        assert!(!engine.snapshot(user).unwrap().awaiting_withdrawal_id);
        assert_eq!(
            notices(&engine.on_text(user, "x@y")),
            vec![&Notice::UseMenu, &Notice::ActionMenu]
        );
    }

    #[test]
    fn test_menu_label_text_during_withdrawal_prompt_is_an_action() {
        let engine = engine();
        let user = UserId(20);
        verify(&engine, user);
        engine.on_menu_action(user, MenuAction::Bonus);
        engine.on_menu_action(user, MenuAction::Withdraw);

        assert_eq!(
            notices(&engine.on_text(user, "💰Balance")),
            vec![&Notice::Balance { balance: 1 }]
        );
        assert!(!engine.snapshot(user).unwrap().awaiting_withdrawal_id);
        assert_eq!(engine.balance(user), 1);
    }

    #[test]
    fn test_withdrawal_identifier_outside_substate_is_ignored() {
        let engine = engine();
        let user = UserId(18);
        verify(&engine, user);
        engine.on_menu_action(user, MenuAction::Bonus);
        let out = engine.on_withdrawal_identifier(user, "a@b");
        assert_eq!(notices(&out), vec![&Notice::UseMenu, &Notice::ActionMenu]);
        assert_eq!(engine.balance(user), 1);
    }

    #[test]
    fn test_text_routing_by_stage() {
        let engine = engine();
        let user = UserId(19);
        assert_eq!(notices(&engine.on_text(user, "hello")), vec![&Notice::Welcome]);
        engine.on_claim(user);
        engine.on_claim(user);
        assert_eq!(notices(&engine.on_text(user, "hello")), vec![&Notice::ContactRequired]);
        // menu labels typed as text behave like the buttons
        assert_eq!(
            notices(&engine.on_text(user, "💰Balance")),
            vec![&Notice::Balance { balance: 0 }]
        );
    }
}
