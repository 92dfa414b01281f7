//! The validator facade: committed state plus the block overlay, unified
//! into the predicate surface instructions consume.
//!
//! All overlay precedence rules live here, in one place: revoke shadows
//! grant, a used offer shadows a newly created one, a publication shadows
//! the grant it consumes, an update shadows a same-block creation, and the
//! overlay always answers before the committed store. This is what gives a
//! block read-your-writes ordering across its instructions.

use aereum_core::{Hash, StageKeys};
use aereum_instructions::{InstructionValidator, Payment};
use aereum_state::{Mutation, State};
use async_trait::async_trait;

/// Committed state overlaid with one block's pending mutations.
///
/// Owned by a single block builder; not shared across workers.
pub struct MutatingState<'a> {
    state: &'a State,
    epoch: u64,
    mutations: Mutation,
    fee_collected: u64,
}

impl<'a> MutatingState<'a> {
    pub fn new(state: &'a State) -> Self {
        Self {
            state,
            epoch: state.epoch(),
            mutations: Mutation::new(),
            fee_collected: 0,
        }
    }

    pub fn mutations(&self) -> &Mutation {
        &self.mutations
    }

    pub fn fee_collected(&self) -> u64 {
        self.fee_collected
    }

    pub(crate) fn into_parts(self) -> (Mutation, u64) {
        (self.mutations, self.fee_collected)
    }

    /// Snapshot for instruction-level atomicity: a rejected instruction
    /// must leave no overlay trace.
    pub(crate) fn snapshot(&self) -> (Mutation, u64) {
        (self.mutations.clone(), self.fee_collected)
    }

    pub(crate) fn restore(&mut self, snapshot: (Mutation, u64)) {
        self.mutations = snapshot.0;
        self.fee_collected = snapshot.1;
    }

    /// Committed balance adjusted by the pending delta.
    async fn balance(&self, hash: &Hash) -> u64 {
        let (_, committed) = self.state.wallets.balance(hash).await;
        apply_delta(committed, self.mutations.delta_balance(hash))
    }

    async fn deposit_balance(&self, hash: &Hash) -> u64 {
        let (_, committed) = self.state.deposits.balance(hash).await;
        apply_delta(committed, self.mutations.delta_deposit(hash))
    }
}

fn apply_delta(committed: u64, delta: i64) -> u64 {
    if delta < 0 {
        committed.saturating_sub(delta.unsigned_abs())
    } else {
        committed.saturating_add(delta as u64)
    }
}

#[async_trait]
impl InstructionValidator for MutatingState<'_> {
    fn epoch(&self) -> u64 {
        self.epoch
    }

    async fn has_member(&self, hash: &Hash) -> bool {
        if self.mutations.has_member(hash) {
            return true;
        }
        self.state.members.contains(hash).await
    }

    async fn has_caption(&self, hash: &Hash) -> bool {
        if self.mutations.has_caption(hash) {
            return true;
        }
        self.state.captions.contains(hash).await
    }

    async fn power_of_attorney(&self, hash: &Hash) -> bool {
        if self.mutations.has_revoke_power(hash) {
            return false;
        }
        if self.mutations.has_grant_power(hash) {
            return true;
        }
        self.state.power_of_attorney.contains(hash).await
    }

    async fn sponsorship_offer(&self, hash: &Hash) -> u64 {
        if self.mutations.has_used_sponsor_offer(hash) {
            return 0;
        }
        if let Some(expire) = self.mutations.sponsor_offer(hash) {
            return expire;
        }
        self.state.sponsor_offers.get(hash).await
    }

    async fn has_granted_sponsor(&self, hash: &Hash) -> Option<Hash> {
        if self.mutations.publish_spn.contains(hash) {
            return None;
        }
        if let Some(content_hash) = self.mutations.granted_sponsorship(hash) {
            return Some(content_hash);
        }
        self.state.sponsor_granted.get_content_hash(hash).await
    }

    async fn get_audience_keys(&self, hash: &Hash) -> Option<StageKeys> {
        if let Some(keys) = self.mutations.get_stage(hash) {
            return Some(keys);
        }
        self.state.stages.get_keys(hash).await
    }

    async fn get_ephemeral_expire(&self, hash: &Hash) -> Option<u64> {
        if let Some(expire) = self.mutations.ephemeral_expire(hash) {
            return Some(expire);
        }
        match self.state.ephemeral_tokens.get(hash).await {
            0 => None,
            expire => Some(expire),
        }
    }

    async fn can_pay(&mut self, payment: &Payment) -> bool {
        for entry in &payment.debits {
            let available = self.balance(&entry.account).await + payment.credited_to(&entry.account);
            if available < entry.value {
                return false;
            }
        }
        for entry in &payment.debits {
            *self.mutations.delta_wallets.entry(entry.account).or_insert(0) -=
                entry.value as i64;
        }
        for entry in &payment.credits {
            *self.mutations.delta_wallets.entry(entry.account).or_insert(0) +=
                entry.value as i64;
        }
        true
    }

    fn add_fee_collected(&mut self, fee: u64) {
        self.fee_collected += fee;
    }

    async fn deposit(&mut self, hash: Hash, value: u64) {
        *self.mutations.delta_deposits.entry(hash).or_insert(0) += value as i64;
    }

    async fn can_withdraw(&mut self, hash: Hash, value: u64) -> bool {
        if self.deposit_balance(&hash).await < value {
            return false;
        }
        *self.mutations.delta_deposits.entry(hash).or_insert(0) -= value as i64;
        true
    }

    async fn set_new_member(&mut self, token_hash: Hash, caption_hash: Hash) -> bool {
        if self.has_member(&token_hash).await || self.has_caption(&caption_hash).await {
            return false;
        }
        self.mutations.new_members.insert(token_hash);
        self.mutations.new_captions.insert(caption_hash);
        true
    }

    async fn set_new_caption(&mut self, caption_hash: Hash) -> bool {
        if self.has_caption(&caption_hash).await {
            return false;
        }
        self.mutations.new_captions.insert(caption_hash);
        true
    }

    async fn set_new_audience(&mut self, hash: Hash, keys: StageKeys) -> bool {
        if self.get_audience_keys(&hash).await.is_some() {
            return false;
        }
        self.mutations.new_stages.insert(hash, keys);
        true
    }

    async fn update_audience(&mut self, hash: Hash, keys: StageKeys) -> bool {
        if self.get_audience_keys(&hash).await.is_none() {
            return false;
        }
        self.mutations.stage_updates.insert(hash, keys);
        true
    }

    async fn set_new_grant_power(&mut self, hash: Hash) -> bool {
        if self.power_of_attorney(&hash).await {
            return false;
        }
        // a re-grant cancels a pending same-block revoke, keeping the two
        // sets mutually exclusive
        self.mutations.revoke_power.remove(&hash);
        self.mutations.grant_power.insert(hash);
        true
    }

    async fn set_new_revoke_power(&mut self, hash: Hash) -> bool {
        if !self.power_of_attorney(&hash).await {
            return false;
        }
        self.mutations.grant_power.remove(&hash);
        self.mutations.revoke_power.insert(hash);
        true
    }

    async fn set_new_spn_offer(&mut self, hash: Hash, expire: u64) -> bool {
        if self.sponsorship_offer(&hash).await != 0 {
            return false;
        }
        self.mutations.new_spn_offers.insert(hash, expire);
        true
    }

    async fn set_new_use_spn_offer(&mut self, hash: Hash) -> bool {
        if self.sponsorship_offer(&hash).await == 0 {
            return false;
        }
        self.mutations.use_spn_offer.insert(hash);
        true
    }

    async fn set_new_granted_sponsor(&mut self, hash: Hash, content_hash: Hash) -> bool {
        if self.has_granted_sponsor(&hash).await.is_some() {
            return false;
        }
        self.mutations.grant_sponsor.insert(hash, content_hash);
        true
    }

    async fn set_publish_sponsor(&mut self, hash: Hash) -> bool {
        if self.has_granted_sponsor(&hash).await.is_none() {
            return false;
        }
        self.mutations.publish_spn.insert(hash);
        true
    }

    async fn set_new_ephemeral_token(&mut self, hash: Hash, expire: u64) -> bool {
        if self.get_ephemeral_expire(&hash).await.is_some() {
            return false;
        }
        self.mutations.new_ephemeral.insert(hash, expire);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aereum_core::Token;
    use aereum_state::GenesisConfig;

    fn h(byte: u8) -> Hash {
        Hash::from_bytes([byte; 32])
    }

    fn keys(stage: u8) -> StageKeys {
        StageKeys {
            moderate: Token::ZERO,
            submit: Token::from_bytes([stage; 32]),
            stage: Token::from_bytes([stage + 1; 32]),
            flag: 0,
        }
    }

    #[tokio::test]
    async fn member_writes_are_read_back() {
        let (state, _) = State::genesis(GenesisConfig::default()).await;
        let mut v = MutatingState::new(&state);
        assert!(!v.has_member(&h(1)).await);
        assert!(v.set_new_member(h(1), h(2)).await);
        assert!(v.has_member(&h(1)).await);
        assert!(v.has_caption(&h(2)).await);
        // uniqueness against the overlay itself
        assert!(!v.set_new_member(h(1), h(3)).await);
        assert!(!v.set_new_caption(h(2)).await);
    }

    #[tokio::test]
    async fn revoke_shadows_grant_and_regrant_cancels_revoke() {
        let (state, _) = State::genesis(GenesisConfig::default()).await;
        let mut v = MutatingState::new(&state);

        assert!(v.set_new_grant_power(h(5)).await);
        assert!(v.power_of_attorney(&h(5)).await);
        assert!(v.set_new_revoke_power(h(5)).await);
        assert!(!v.power_of_attorney(&h(5)).await);
        assert!(v.set_new_grant_power(h(5)).await);
        assert!(v.power_of_attorney(&h(5)).await);
    }

    #[tokio::test]
    async fn revoking_a_committed_power_survives_commit() {
        let (mut state, _) = State::genesis(GenesisConfig::default()).await;
        state.power_of_attorney.insert(h(6)).await;

        let mut v = MutatingState::new(&state);
        assert!(v.power_of_attorney(&h(6)).await);
        assert!(v.set_new_revoke_power(h(6)).await);
        assert!(!v.power_of_attorney(&h(6)).await);

        let (mutation, _) = v.into_parts();
        state.advance_epoch(&mutation).await;
        assert!(!state.power_of_attorney.contains(&h(6)).await);
    }

    #[tokio::test]
    async fn used_offer_shadows_new_offer() {
        let (state, _) = State::genesis(GenesisConfig::default()).await;
        let mut v = MutatingState::new(&state);

        assert!(v.set_new_spn_offer(h(7), 10).await);
        assert_eq!(v.sponsorship_offer(&h(7)).await, 10);
        assert!(v.set_new_use_spn_offer(h(7)).await);
        assert_eq!(v.sponsorship_offer(&h(7)).await, 0);
        // consuming twice fails
        assert!(!v.set_new_use_spn_offer(h(7)).await);
    }

    #[tokio::test]
    async fn publish_shadows_grant_even_when_committed() {
        let (mut state, _) = State::genesis(GenesisConfig::default()).await;
        state.sponsor_granted.set_content_hash(h(8), &h(9)).await;

        let mut v = MutatingState::new(&state);
        assert_eq!(v.has_granted_sponsor(&h(8)).await, Some(h(9)));
        assert!(v.set_publish_sponsor(h(8)).await);
        assert_eq!(v.has_granted_sponsor(&h(8)).await, None);
        assert!(!v.set_publish_sponsor(h(8)).await);
    }

    #[tokio::test]
    async fn stage_update_shadows_creation() {
        let (state, _) = State::genesis(GenesisConfig::default()).await;
        let mut v = MutatingState::new(&state);

        assert!(!v.update_audience(h(10), keys(1)).await);
        assert!(v.set_new_audience(h(10), keys(1)).await);
        assert!(!v.set_new_audience(h(10), keys(2)).await);
        assert!(v.update_audience(h(10), keys(3)).await);
        assert_eq!(v.get_audience_keys(&h(10)).await, Some(keys(3)));
    }

    #[tokio::test]
    async fn can_pay_applies_deltas_for_later_reads() {
        let (state, keypair) = State::genesis(GenesisConfig::default()).await;
        let genesis = Hash::of_token(&keypair.public_key());
        let receiver = h(11);
        let mut v = MutatingState::new(&state);

        let mut payment = Payment::new_debit(genesis, 600_000);
        payment.credit(receiver, 600_000);
        assert!(v.can_pay(&payment).await);
        // the second identical payment sees the debited balance
        assert!(!v.can_pay(&payment).await);
        // but the receiver can now spend what it received
        let spend = Payment::new_debit(receiver, 500_000);
        assert!(v.can_pay(&spend).await);
    }

    #[tokio::test]
    async fn deposits_and_withdrawals_track_the_overlay() {
        let (state, _) = State::genesis(GenesisConfig::default()).await;
        let mut v = MutatingState::new(&state);

        v.deposit(h(12), 40).await;
        assert!(!v.can_withdraw(h(12), 41).await);
        assert!(v.can_withdraw(h(12), 40).await);
        assert!(!v.can_withdraw(h(12), 1).await);
    }

    #[tokio::test]
    async fn ephemeral_writes_are_read_back() {
        let (state, _) = State::genesis(GenesisConfig::default()).await;
        let mut v = MutatingState::new(&state);

        assert_eq!(v.get_ephemeral_expire(&h(13)).await, None);
        assert!(v.set_new_ephemeral_token(h(13), 5).await);
        assert_eq!(v.get_ephemeral_expire(&h(13)).await, Some(5));
        assert!(!v.set_new_ephemeral_token(h(13), 6).await);
    }
}
