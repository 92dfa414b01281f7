//! The validator capability surface consumed by instruction kinds.
//!
//! This trait presents the prevailing ledger state at a certain epoch
//! together with the mutations needed to apply new instructions. It is
//! declared here, in the instruction crate, and implemented by the state
//! layer: instructions depend on capabilities, never on concrete stores.
//!
//! Every mutator returns `true` iff the write is newly effective; `false`
//! means it conflicted with an existing committed or pending entry, and the
//! calling instruction must reject.

use aereum_core::{Hash, StageKeys};
use async_trait::async_trait;

use crate::payment::Payment;

#[async_trait]
pub trait InstructionValidator: Send {
    // ─────────────────────────────────────────────────────────────────────
    // Context
    // ─────────────────────────────────────────────────────────────────────

    /// The epoch of the block under construction.
    fn epoch(&self) -> u64;

    // ─────────────────────────────────────────────────────────────────────
    // Presence queries
    // ─────────────────────────────────────────────────────────────────────

    async fn has_member(&self, hash: &Hash) -> bool;

    async fn has_caption(&self, hash: &Hash) -> bool;

    /// Whether `hash(grantor || attorney)` names a live delegation.
    async fn power_of_attorney(&self, hash: &Hash) -> bool;

    /// Expiry epoch of a sponsorship offer; zero if absent or consumed.
    async fn sponsorship_offer(&self, hash: &Hash) -> u64;

    /// Content hash authorized for `hash(author || stage)`, if any.
    async fn has_granted_sponsor(&self, hash: &Hash) -> Option<Hash>;

    async fn get_audience_keys(&self, hash: &Hash) -> Option<StageKeys>;

    async fn get_ephemeral_expire(&self, hash: &Hash) -> Option<u64>;

    // ─────────────────────────────────────────────────────────────────────
    // Economy
    // ─────────────────────────────────────────────────────────────────────

    /// Check feasibility of a payment and, on success, apply its deltas to
    /// the pending overlay. A payment is feasible iff every debit account
    /// covers its debit after summing the credits the payment sends it.
    async fn can_pay(&mut self, payment: &Payment) -> bool;

    fn add_fee_collected(&mut self, fee: u64);

    /// Credit the deposits book.
    async fn deposit(&mut self, hash: Hash, value: u64);

    /// Check the deposits book covers `value` and, on success, debit it.
    async fn can_withdraw(&mut self, hash: Hash, value: u64) -> bool;

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    async fn set_new_member(&mut self, token_hash: Hash, caption_hash: Hash) -> bool;

    async fn set_new_caption(&mut self, caption_hash: Hash) -> bool;

    async fn set_new_audience(&mut self, hash: Hash, keys: StageKeys) -> bool;

    async fn update_audience(&mut self, hash: Hash, keys: StageKeys) -> bool;

    async fn set_new_grant_power(&mut self, hash: Hash) -> bool;

    async fn set_new_revoke_power(&mut self, hash: Hash) -> bool;

    async fn set_new_spn_offer(&mut self, hash: Hash, expire: u64) -> bool;

    async fn set_new_use_spn_offer(&mut self, hash: Hash) -> bool;

    async fn set_new_granted_sponsor(&mut self, hash: Hash, content_hash: Hash) -> bool;

    async fn set_publish_sponsor(&mut self, hash: Hash) -> bool;

    async fn set_new_ephemeral_token(&mut self, hash: Hash, expire: u64) -> bool;
}
