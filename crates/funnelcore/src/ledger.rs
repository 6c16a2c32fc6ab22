//! Per-user balance store
//!
//! Balances are whole credit units. Entries are created lazily with a zero balance
//! and live for the lifetime of the store.

use dashmap::DashMap;

use crate::types::UserId;

/// Read/write contract the funnel engine uses for balances.
///
/// All operations are total over the identifier space. Every mutation is atomic
/// for the user it touches.
pub trait LedgerStore: Send + Sync {
    /// Current balance, 0 when the user has no entry yet.
    fn get_balance(&self, user: UserId) -> u64;

    /// Adds `delta` to the balance, creating the entry if needed. Returns the new balance.
    fn add(&self, user: UserId, delta: u64) -> u64;

    /// Sets the balance to 0. Returns the balance held before the reset.
    fn reset(&self, user: UserId) -> u64;
}

/// In-memory ledger backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: DashMap<UserId, u64>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a ledger entry
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

impl LedgerStore for InMemoryLedger {
    fn get_balance(&self, user: UserId) -> u64 {
        self.balances.get(&user).map(|b| *b).unwrap_or(0)
    }

    fn add(&self, user: UserId, delta: u64) -> u64 {
        let mut entry = self.balances.entry(user).or_insert(0);
        *entry = entry.saturating_add(delta);
        *entry
    }

    fn reset(&self, user: UserId) -> u64 {
        let mut entry = self.balances.entry(user).or_insert(0);
        std::mem::replace(&mut *entry, 0)
    }
}
