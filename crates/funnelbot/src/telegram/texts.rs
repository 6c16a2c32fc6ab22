//! Chat text for every notice the funnel engine can emit

use funnelcore::{ContactPayload, Notice, UserId};
use indoc::{formatdoc, indoc};
use teloxide::types::ParseMode;
use teloxide::utils::html;

/// A notice rendered to Telegram message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub disable_link_preview: bool,
}

impl RenderedText {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            disable_link_preview: false,
        }
    }

    fn html(text: String) -> Self {
        Self {
            text,
            parse_mode: Some(ParseMode::Html),
            disable_link_preview: false,
        }
    }
}

const WELCOME: &str = indoc! {"
    👋 Hey There User Welcome To Bot!

    ⚠️ Must Join Total Channel To Use Our Bot

    💥 After Joining Click Claim"};

/// Renders `notice`, using `currency` in front of every amount.
pub fn render(notice: &Notice, currency: &str) -> RenderedText {
    match notice {
        Notice::Welcome => RenderedText::plain(WELCOME),
        Notice::JoinRequired => {
            RenderedText::plain("❌ Please join all channel and group first, then click 'Claim' again.")
        }
        Notice::ShareContact => RenderedText::plain("📱 Please share your profile to avoid fake accounts."),
        Notice::ContactRequired => RenderedText::plain("Please share your contact using the button provided."),
        Notice::ClaimFirst => RenderedText::plain("⚠️ Please join the channels and click 'Claim' first."),
        Notice::ContactSaved => RenderedText::plain(
            "Thank you for sharing your contact! Don't worry, your contact will never be shared with anyone.",
        ),
        Notice::AlreadyVerified => RenderedText::plain("✅ You are already verified."),
        Notice::ActionMenu => RenderedText::plain("Choose an option:"),
        Notice::VerificationRequired => {
            RenderedText::plain("⚠️ Please complete verification first: click 'Claim' and share your profile.")
        }
        Notice::Balance { balance } => {
            RenderedText::plain(format!("Your current balance is: {}{}", currency, balance))
        }
        Notice::ReferralLink { link } => RenderedText {
            text: format!(
                "Aapka referral link yeh hai, apne doston ke saath share karke aur kama sakte hain:\n{}",
                link
            ),
            parse_mode: None,
            disable_link_preview: true,
        },
        Notice::AskWithdrawalId => RenderedText::plain("Please enter your UPI ID to proceed with the withdrawal:"),
        Notice::InvalidWithdrawalId => RenderedText::plain(
            "Invalid UPI ID. Kripya ek valid UPI ID enter karein jo '@' contain karti ho.",
        ),
        Notice::WithdrawalAccepted { .. } => RenderedText::plain(
            "✅ Aapka amount successfully withdraw kar diya gaya hai. \
             Kripya 1 se 2 minute ke andar apne UPI account ko check karein.",
        ),
        Notice::BonusGranted { amount } => RenderedText::plain(format!("Congrats 🎁 you won {}{}", currency, amount)),
        Notice::BalanceUpdated { balance } => {
            RenderedText::plain(format!("Aapka balance update ho chuka hai: {}{}", currency, balance))
        }
        Notice::BonusAlreadyClaimed => RenderedText::plain("You already claimed your bonus."),
        Notice::ReferralCredited { amount, balance, .. } => RenderedText::plain(format!(
            "🙌 You got {}{} for a friend invited by your link!\nAapka balance update ho chuka hai: {}{}",
            currency, amount, currency, balance
        )),
        Notice::UseMenu => RenderedText::plain("Please use the menu buttons below."),
        Notice::ContactCaptured { user, contact } => RenderedText::html(contact_captured(*user, contact)),
        Notice::WithdrawalRequested {
            user,
            identifier,
            amount,
            referrals,
            contact,
        } => RenderedText::html(withdrawal_requested(
            *user,
            identifier,
            *amount,
            *referrals,
            contact.as_ref(),
            currency,
        )),
    }
}

fn contact_captured(user: UserId, contact: &ContactPayload) -> String {
    let phone = html::escape(&contact.phone);
    formatdoc! {"
        New Contact Info Received:
        Name: <code>{name}</code>
        Phone: <a href='tel:{phone}'>{phone}</a>
        Chat ID: <code>{user}</code>

        Click to copy: <code>{phone}</code>",
        name = html::escape(&contact.full_name()),
    }
}

fn withdrawal_requested(
    user: UserId,
    identifier: &str,
    amount: u64,
    referrals: u64,
    contact: Option<&ContactPayload>,
    currency: &str,
) -> String {
    let name = contact.map(|c| html::escape(&c.full_name())).unwrap_or_else(|| "unknown".to_string());
    let phone = contact.map(|c| html::escape(&c.phone)).unwrap_or_else(|| "unknown".to_string());
    formatdoc! {"
        User Details:
        Name: {name}
        Phone: {phone}
        Chat ID: <code>{user}</code>
        UPI ID: <code>{identifier}</code>
        Earnings from Referrals: {currency}{amount}
        Total Referrals: {referrals}",
        identifier = html::escape(identifier),
        currency = html::escape(currency),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_welcome_text() {
        let rendered = render(&Notice::Welcome, "₹");
        assert!(rendered.text.starts_with("👋 Hey There User Welcome To Bot!"));
        assert!(rendered.text.ends_with("💥 After Joining Click Claim"));
        assert_eq!(rendered.parse_mode, None);
    }

    #[test]
    fn test_amounts_use_currency_symbol() {
        assert_eq!(
            render(&Notice::Balance { balance: 12 }, "₹").text,
            "Your current balance is: ₹12"
        );
        assert_eq!(render(&Notice::BonusGranted { amount: 1 }, "$").text, "Congrats 🎁 you won $1");
    }

    #[test]
    fn test_referral_link_disables_preview() {
        let rendered = render(
            &Notice::ReferralLink {
                link: "https://t.me/bot?start=1".to_string(),
            },
            "₹",
        );
        assert!(rendered.disable_link_preview);
        assert!(rendered.text.ends_with("\nhttps://t.me/bot?start=1"));
    }

    #[test]
    fn test_operator_contact_is_html_escaped() {
        let contact = ContactPayload::new("+91<1>", "A&B", None).unwrap();
        let rendered = render(
            &Notice::ContactCaptured {
                user: UserId(5),
                contact,
            },
            "₹",
        );
        assert_eq!(rendered.parse_mode, Some(ParseMode::Html));
        assert!(rendered.text.contains("Name: <code>A&amp;B</code>"));
        assert!(rendered.text.contains("<a href='tel:+91&lt;1&gt;'>+91&lt;1&gt;</a>"));
        assert!(rendered.text.contains("Chat ID: <code>5</code>"));
    }

    #[test]
    fn test_withdrawal_summary_without_contact() {
        let rendered = render(
            &Notice::WithdrawalRequested {
                user: UserId(77),
                identifier: "me@upi".to_string(),
                amount: 4,
                referrals: 3,
                contact: None,
            },
            "₹",
        );
        assert_eq!(
            rendered.text,
            "User Details:\nName: unknown\nPhone: unknown\nChat ID: <code>77</code>\nUPI ID: <code>me@upi</code>\n\
             Earnings from Referrals: ₹4\nTotal Referrals: 3"
        );
    }
}
