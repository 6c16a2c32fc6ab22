//! Metrics collection using Prometheus
//!
//! Tracks:
//! - Inbound events by kind (first contact, claim, contact, menu, text)
//! - Notices sent and failed deliveries by notice kind
//! - Business counters (bonuses, referral credits, withdrawals)

use std::sync::LazyLock;

use funnelcore::Notice;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

/// Inbound events handled by the dispatcher
/// Labels: event (first_contact/claim/contact/menu/text)
pub static EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "funnelbot_events_total",
        "Total number of inbound events handled",
        &["event"]
    )
    .expect("funnelbot_events_total registers once")
});

/// Notices handed to Telegram
/// Labels: kind (welcome/balance/...)
pub static NOTICES_SENT_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "funnelbot_notices_sent_total",
        "Total number of notices delivered",
        &["kind"]
    )
    .expect("funnelbot_notices_sent_total registers once")
});

/// Notices that could not be delivered
/// Labels: kind
pub static DELIVERY_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "funnelbot_delivery_failures_total",
        "Total number of notices that failed to send",
        &["kind"]
    )
    .expect("funnelbot_delivery_failures_total registers once")
});

pub static BONUSES_GRANTED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("funnelbot_bonuses_granted_total", "Total number of one-time bonuses granted")
        .expect("funnelbot_bonuses_granted_total registers once")
});

pub static REFERRAL_CREDITS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "funnelbot_referral_credits_total",
        "Total number of referral credits paid to referrers"
    )
    .expect("funnelbot_referral_credits_total registers once")
});

/// Withdrawal attempts
/// Labels: outcome (requested/rejected)
pub static WITHDRAWALS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "funnelbot_withdrawals_total",
        "Total number of withdrawal identifiers received by outcome",
        &["outcome"]
    )
    .expect("funnelbot_withdrawals_total registers once")
});

/// Initialize all metrics so they appear in /metrics with zero values
pub fn init_metrics() {
    log::info!("Initializing metrics registry...");

    for event in ["first_contact", "claim", "contact", "menu", "text"] {
        EVENTS_TOTAL.with_label_values(&[event]);
    }
    let _ = &*NOTICES_SENT_TOTAL;
    let _ = &*DELIVERY_FAILURES_TOTAL;
    let _ = &*BONUSES_GRANTED_TOTAL;
    let _ = &*REFERRAL_CREDITS_TOTAL;
    for outcome in ["requested", "rejected"] {
        WITHDRAWALS_TOTAL.with_label_values(&[outcome]);
    }

    log::info!("Metrics registry initialized");
}

/// Counts an inbound event
pub fn record_event(event: &str) {
    EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Counts the business event a notice reports, whether or not it reaches Telegram
pub fn record_business_event(notice: &Notice) {
    match notice {
        Notice::BonusGranted { .. } => BONUSES_GRANTED_TOTAL.inc(),
        Notice::ReferralCredited { .. } => REFERRAL_CREDITS_TOTAL.inc(),
        Notice::WithdrawalRequested { .. } => WITHDRAWALS_TOTAL.with_label_values(&["requested"]).inc(),
        Notice::InvalidWithdrawalId => WITHDRAWALS_TOTAL.with_label_values(&["rejected"]).inc(),
        _ => {}
    }
}

/// Counts a notice Telegram accepted
pub fn record_notice_sent(notice: &Notice) {
    NOTICES_SENT_TOTAL.with_label_values(&[notice.kind()]).inc();
}

/// Counts a notice that Telegram refused or that had no destination
pub fn record_delivery_failure(notice: &Notice) {
    DELIVERY_FAILURES_TOTAL.with_label_values(&[notice.kind()]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnelcore::UserId;

    #[test]
    fn test_business_events_are_counted_apart_from_sends() {
        let bonuses = BONUSES_GRANTED_TOTAL.get();
        let referrals = REFERRAL_CREDITS_TOTAL.get();
        let rejected = WITHDRAWALS_TOTAL.with_label_values(&["rejected"]).get();
        let sent = NOTICES_SENT_TOTAL.with_label_values(&["referral_credited"]).get();

        record_business_event(&Notice::BonusGranted { amount: 1 });
        record_business_event(&Notice::ReferralCredited {
            amount: 1,
            balance: 1,
            referred: UserId(2),
        });
        record_business_event(&Notice::InvalidWithdrawalId);

        // other tests may record concurrently, so only lower bounds are stable
        assert!(BONUSES_GRANTED_TOTAL.get() > bonuses);
        assert!(REFERRAL_CREDITS_TOTAL.get() > referrals);
        assert!(WITHDRAWALS_TOTAL.with_label_values(&["rejected"]).get() > rejected);
        assert_eq!(NOTICES_SENT_TOTAL.with_label_values(&["referral_credited"]).get(), sent);

        record_notice_sent(&Notice::ReferralCredited {
            amount: 1,
            balance: 1,
            referred: UserId(2),
        });
        assert_eq!(NOTICES_SENT_TOTAL.with_label_values(&["referral_credited"]).get(), sent + 1);
    }
}
