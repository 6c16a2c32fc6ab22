//! Per-user funnel progress store
//!
//! Holds each user's stage, who referred them, whether the one-time bonus has
//! fired, the captured contact and the withdrawal sub-state. The compare-and-set
//! style operations (`mark_bonus_received`, `set_referrer_once`, `advance_stage`)
//! are atomic per user.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::types::{ContactPayload, Stage, UserId};

/// Everything the funnel knows about one user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunnelState {
    pub stage: Stage,
    /// Write-once
    pub referrer: Option<UserId>,
    /// Single-fire, never reset
    pub bonus_received: bool,
    pub awaiting_withdrawal_id: bool,
    pub contact: Option<ContactPayload>,
    /// Referred users whose bonus credited this user
    pub referrals_credited: u64,
}

/// Read/write contract the funnel engine uses for per-user progress.
pub trait FunnelStore: Send + Sync {
    /// Creates the user's entry with defaults if missing. Returns `true` when this
    /// call created it, i.e. this is the user's first contact.
    fn register(&self, user: UserId) -> bool;

    fn is_known(&self, user: UserId) -> bool;

    /// Current stage, `Stage::New` for unknown users.
    fn get_stage(&self, user: UserId) -> Stage;

    /// Unconditionally sets the stage.
    fn set_stage(&self, user: UserId, stage: Stage);

    /// Moves the user to `stage` only if that is forward progress. Returns the stage
    /// the user ends up in.
    fn advance_stage(&self, user: UserId, stage: Stage) -> Stage;

    fn get_referrer(&self, user: UserId) -> Option<UserId>;

    /// Records the referrer unless one is already set. Returns `true` if recorded.
    fn set_referrer_once(&self, user: UserId, referrer: UserId) -> bool;

    /// Marks the bonus as received. Returns `true` only for the call that flipped
    /// the flag; every later call returns `false` and changes nothing.
    fn mark_bonus_received(&self, user: UserId) -> bool;

    fn set_awaiting_withdrawal(&self, user: UserId, awaiting: bool);

    fn is_awaiting_withdrawal(&self, user: UserId) -> bool;

    fn record_contact(&self, user: UserId, contact: ContactPayload);

    fn get_contact(&self, user: UserId) -> Option<ContactPayload>;

    /// Counts one more credited referral for `referrer`. Returns the new count.
    fn record_referral_credit(&self, referrer: UserId) -> u64;

    fn referral_count(&self, user: UserId) -> u64;

    /// Full snapshot of a user's state, if known.
    fn snapshot(&self, user: UserId) -> Option<FunnelState>;
}

/// In-memory funnel store backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryFunnelStore {
    users: DashMap<UserId, FunnelState>,
}

impl InMemoryFunnelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users that have contacted the bot
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn read<T>(&self, user: UserId, default: T, f: impl FnOnce(&FunnelState) -> T) -> T {
        self.users.get(&user).map(|state| f(&state)).unwrap_or(default)
    }

    fn update<T>(&self, user: UserId, f: impl FnOnce(&mut FunnelState) -> T) -> T {
        let mut state = self.users.entry(user).or_default();
        f(&mut state)
    }
}

impl FunnelStore for InMemoryFunnelStore {
    fn register(&self, user: UserId) -> bool {
        match self.users.entry(user) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(FunnelState::default());
                true
            }
        }
    }

    fn is_known(&self, user: UserId) -> bool {
        self.users.contains_key(&user)
    }

    fn get_stage(&self, user: UserId) -> Stage {
        self.read(user, Stage::New, |s| s.stage)
    }

    fn set_stage(&self, user: UserId, stage: Stage) {
        self.update(user, |s| s.stage = stage);
    }

    fn advance_stage(&self, user: UserId, stage: Stage) -> Stage {
        self.update(user, |s| {
            if stage > s.stage {
                s.stage = stage;
            }
            s.stage
        })
    }

    fn get_referrer(&self, user: UserId) -> Option<UserId> {
        self.read(user, None, |s| s.referrer)
    }

    fn set_referrer_once(&self, user: UserId, referrer: UserId) -> bool {
        self.update(user, |s| {
            if s.referrer.is_some() {
                return false;
            }
            s.referrer = Some(referrer);
            true
        })
    }

    fn mark_bonus_received(&self, user: UserId) -> bool {
        self.update(user, |s| !std::mem::replace(&mut s.bonus_received, true))
    }

    fn set_awaiting_withdrawal(&self, user: UserId, awaiting: bool) {
        self.update(user, |s| s.awaiting_withdrawal_id = awaiting);
    }

    fn is_awaiting_withdrawal(&self, user: UserId) -> bool {
        self.read(user, false, |s| s.awaiting_withdrawal_id)
    }

    fn record_contact(&self, user: UserId, contact: ContactPayload) {
        self.update(user, |s| s.contact = Some(contact));
    }

    fn get_contact(&self, user: UserId) -> Option<ContactPayload> {
        self.read(user, None, |s| s.contact.clone())
    }

    fn record_referral_credit(&self, referrer: UserId) -> u64 {
        self.update(referrer, |s| {
            s.referrals_credited = s.referrals_credited.saturating_add(1);
            s.referrals_credited
        })
    }

    fn referral_count(&self, user: UserId) -> u64 {
        self.read(user, 0, |s| s.referrals_credited)
    }

    fn snapshot(&self, user: UserId) -> Option<FunnelState> {
        self.users.get(&user).map(|s| s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_register_reports_first_contact_once() {
        let store = InMemoryFunnelStore::new();
        assert!(!store.is_known(UserId(1)));
        assert!(store.register(UserId(1)));
        assert!(!store.register(UserId(1)));
        assert!(store.is_known(UserId(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_defaults_for_unknown_user() {
        let store = InMemoryFunnelStore::new();
        assert_eq!(store.get_stage(UserId(5)), Stage::New);
        assert_eq!(store.get_referrer(UserId(5)), None);
        assert!(!store.is_awaiting_withdrawal(UserId(5)));
        assert_eq!(store.referral_count(UserId(5)), 0);
        assert!(store.snapshot(UserId(5)).is_none());
        // none of the reads above create an entry
        assert!(store.is_empty());
    }

    #[test]
    fn test_referrer_is_write_once() {
        let store = InMemoryFunnelStore::new();
        assert!(store.set_referrer_once(UserId(2), UserId(1)));
        assert!(!store.set_referrer_once(UserId(2), UserId(3)));
        assert_eq!(store.get_referrer(UserId(2)), Some(UserId(1)));
    }

    #[test]
    fn test_mark_bonus_received_is_single_fire() {
        let store = InMemoryFunnelStore::new();
        assert!(store.mark_bonus_received(UserId(1)));
        assert!(!store.mark_bonus_received(UserId(1)));
        assert!(!store.mark_bonus_received(UserId(1)));
        assert!(store.snapshot(UserId(1)).unwrap().bonus_received);
    }

    #[test]
    fn test_advance_stage_never_moves_backwards() {
        let store = InMemoryFunnelStore::new();
        assert_eq!(store.advance_stage(UserId(1), Stage::Verified), Stage::Verified);
        assert_eq!(store.advance_stage(UserId(1), Stage::ClaimRequested), Stage::Verified);
        assert_eq!(store.get_stage(UserId(1)), Stage::Verified);
        store.set_stage(UserId(1), Stage::New);
        assert_eq!(store.get_stage(UserId(1)), Stage::New);
    }

    #[test]
    fn test_contact_and_withdrawal_flags() {
        let store = InMemoryFunnelStore::new();
        let contact = ContactPayload::new("+1", "Ann", None).unwrap();
        store.record_contact(UserId(1), contact.clone());
        assert_eq!(store.get_contact(UserId(1)), Some(contact));

        store.set_awaiting_withdrawal(UserId(1), true);
        assert!(store.is_awaiting_withdrawal(UserId(1)));
        store.set_awaiting_withdrawal(UserId(1), false);
        assert!(!store.is_awaiting_withdrawal(UserId(1)));
    }

    #[test]
    fn test_referral_credit_counter() {
        let store = InMemoryFunnelStore::new();
        assert_eq!(store.record_referral_credit(UserId(1)), 1);
        assert_eq!(store.record_referral_credit(UserId(1)), 2);
        assert_eq!(store.referral_count(UserId(1)), 2);
    }

    #[test]
    fn test_concurrent_bonus_marks_fire_once() {
        let store = Arc::new(InMemoryFunnelStore::new());
        let wins = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if store.mark_bonus_received(UserId(9)) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
