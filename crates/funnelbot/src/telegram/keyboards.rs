//! Reply and inline keyboards attached to notices

use funnelcore::{Keyboard, MenuAction};
use strum::IntoEnumIterator;
use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};
use url::Url;

use crate::core::config;
use crate::core::error::AppResult;

/// Callback data carried by the inline "Claim" button
pub const CLAIM_CALLBACK: &str = "claim";

/// Label of the contact-sharing reply button
pub const SHARE_CONTACT_LABEL: &str = "✅ Share Your Profile";

/// Channel and group users are asked to join before claiming.
#[derive(Clone, Debug)]
pub struct JoinLinks {
    pub channel: Url,
    pub group: Url,
}

impl JoinLinks {
    pub fn new(channel: &str, group: &str) -> AppResult<Self> {
        Ok(Self {
            channel: Url::parse(channel)?,
            group: Url::parse(group)?,
        })
    }

    /// Links from JOIN_CHANNEL_URL / JOIN_GROUP_URL
    pub fn from_config() -> AppResult<Self> {
        Self::new(&config::JOIN_CHANNEL_URL, &config::JOIN_GROUP_URL)
    }
}

/// Builds the Telegram markup for a funnel keyboard
pub fn render(keyboard: Keyboard, links: &JoinLinks) -> ReplyMarkup {
    match keyboard {
        Keyboard::JoinAndClaim => join_and_claim(links).into(),
        Keyboard::ShareContact => share_contact().into(),
        Keyboard::ActionMenu => action_menu().into(),
    }
}

fn join_and_claim(links: &JoinLinks) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::url("📢 Join Channel", links.channel.clone()),
            InlineKeyboardButton::url("👥 Join Group", links.group.clone()),
        ],
        vec![InlineKeyboardButton::callback("Claim", CLAIM_CALLBACK)],
    ])
}

fn share_contact() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(SHARE_CONTACT_LABEL).request(ButtonRequest::Contact),
    ]])
    .resize_keyboard()
    .one_time_keyboard()
}

/// Two rows of two: Balance / Withdraw, Referral Link / Bonus
fn action_menu() -> KeyboardMarkup {
    let buttons: Vec<KeyboardButton> = MenuAction::iter().map(|a| KeyboardButton::new(a.as_ref())).collect();
    let rows = buttons.chunks(2).map(<[KeyboardButton]>::to_vec).collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn links() -> JoinLinks {
        JoinLinks::new("https://t.me/some_channel", "https://t.me/some_group").unwrap()
    }

    #[test]
    fn test_join_links_reject_invalid_url() {
        assert!(JoinLinks::new("not a url", "https://t.me/g").is_err());
    }

    #[test]
    fn test_join_and_claim_layout() {
        let markup = join_and_claim(&links());
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[1][0].text, "Claim");
    }

    #[test]
    fn test_share_contact_requests_contact() {
        let markup = share_contact();
        assert_eq!(markup.keyboard.len(), 1);
        assert_eq!(markup.keyboard[0][0].text, SHARE_CONTACT_LABEL);
        assert!(matches!(markup.keyboard[0][0].request, Some(ButtonRequest::Contact)));
        assert!(markup.one_time_keyboard);
    }

    #[test]
    fn test_action_menu_labels_parse_back_to_actions() {
        let markup = action_menu();
        let labels: Vec<&str> = markup.keyboard.iter().flatten().map(|b| b.text.as_str()).collect();
        assert_eq!(labels, vec!["💰Balance", "✅Withdraw", "🙌Referral Link", "🎁Bonus"]);
        for label in labels {
            assert!(label.parse::<MenuAction>().is_ok(), "{label}");
        }
    }
}
