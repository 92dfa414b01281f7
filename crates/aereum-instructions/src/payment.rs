//! Payments: the only path by which balances change during validation.
//!
//! A payment is an unordered collection of per-account debits and credits.
//! Constructors aggregate same-account entries by summing, so feasibility
//! can be judged account by account.

use aereum_core::Hash;

/// One account's share of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentEntry {
    pub account: Hash,
    pub value: u64,
}

/// Debits and credits moved by one instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payment {
    pub debits: Vec<PaymentEntry>,
    pub credits: Vec<PaymentEntry>,
}

impl Payment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A payment consisting of a single debit (the common fee-only case).
    pub fn new_debit(account: Hash, value: u64) -> Self {
        Self {
            debits: vec![PaymentEntry { account, value }],
            credits: Vec::new(),
        }
    }

    /// Add a debit, merging with an existing entry for the same account.
    pub fn debit(&mut self, account: Hash, value: u64) {
        for entry in &mut self.debits {
            if entry.account == account {
                entry.value = entry.value.saturating_add(value);
                return;
            }
        }
        self.debits.push(PaymentEntry { account, value });
    }

    /// Add a credit, merging with an existing entry for the same account.
    pub fn credit(&mut self, account: Hash, value: u64) {
        for entry in &mut self.credits {
            if entry.account == account {
                entry.value = entry.value.saturating_add(value);
                return;
            }
        }
        self.credits.push(PaymentEntry { account, value });
    }

    /// Total credited to the given account by this payment.
    pub fn credited_to(&self, account: &Hash) -> u64 {
        self.credits
            .iter()
            .filter(|e| e.account == *account)
            .map(|e| e.value)
            .sum()
    }
}
