//! The mutation overlay: pending deltas and presence flags accumulated by
//! one block on top of committed state.
//!
//! The overlay mirrors the full set of possible state changes so that
//! uncommitted instructions within a block observe one another. Shadowing
//! pairs are encoded in the read helpers: a publish shadows the grant it
//! consumes, a used offer shadows its creation, and a stage update takes
//! precedence over a same-block creation. The revoke/grant power sets are
//! kept mutually exclusive by the writer (the validator facade).

use std::collections::{HashMap, HashSet};

use aereum_core::{Hash, StageKeys};

#[derive(Debug, Clone, Default)]
pub struct Mutation {
    /// Net wallet delta against committed balances.
    pub delta_wallets: HashMap<Hash, i64>,
    /// Net delta against the deposits book.
    pub delta_deposits: HashMap<Hash, i64>,
    pub grant_power: HashSet<Hash>,
    pub revoke_power: HashSet<Hash>,
    /// Offers consumed this block.
    pub use_spn_offer: HashSet<Hash>,
    /// Offers created this block, with their expiry epoch.
    pub new_spn_offers: HashMap<Hash, u64>,
    /// Grants recorded this block: hash(author || stage) → content hash.
    pub grant_sponsor: HashMap<Hash, Hash>,
    /// Grants consumed this block by a sponsored publication.
    pub publish_spn: HashSet<Hash>,
    pub new_members: HashSet<Hash>,
    pub new_captions: HashSet<Hash>,
    pub new_stages: HashMap<Hash, StageKeys>,
    pub stage_updates: HashMap<Hash, StageKeys>,
    pub new_ephemeral: HashMap<Hash, u64>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delta_balance(&self, hash: &Hash) -> i64 {
        self.delta_wallets.get(hash).copied().unwrap_or(0)
    }

    pub fn delta_deposit(&self, hash: &Hash) -> i64 {
        self.delta_deposits.get(hash).copied().unwrap_or(0)
    }

    /// A grant recorded this block, unless already consumed this block.
    pub fn granted_sponsorship(&self, hash: &Hash) -> Option<Hash> {
        if self.publish_spn.contains(hash) {
            return None;
        }
        self.grant_sponsor.get(hash).copied()
    }

    pub fn has_grant_power(&self, hash: &Hash) -> bool {
        self.grant_power.contains(hash)
    }

    pub fn has_revoke_power(&self, hash: &Hash) -> bool {
        self.revoke_power.contains(hash)
    }

    pub fn has_used_sponsor_offer(&self, hash: &Hash) -> bool {
        self.use_spn_offer.contains(hash)
    }

    /// An offer created this block, unless already consumed this block.
    pub fn sponsor_offer(&self, hash: &Hash) -> Option<u64> {
        if self.use_spn_offer.contains(hash) {
            return None;
        }
        self.new_spn_offers.get(hash).copied()
    }

    pub fn has_member(&self, hash: &Hash) -> bool {
        self.new_members.contains(hash)
    }

    pub fn has_caption(&self, hash: &Hash) -> bool {
        self.new_captions.contains(hash)
    }

    /// Stage keys written this block; an update shadows a creation.
    pub fn get_stage(&self, hash: &Hash) -> Option<StageKeys> {
        if let Some(keys) = self.stage_updates.get(hash) {
            return Some(*keys);
        }
        self.new_stages.get(hash).copied()
    }

    pub fn ephemeral_expire(&self, hash: &Hash) -> Option<u64> {
        self.new_ephemeral.get(hash).copied()
    }
}
