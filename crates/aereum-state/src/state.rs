//! The authoritative ledger state: committed vaults, the epoch counter and
//! the expiry sweep.

use std::collections::HashMap;

use aereum_core::{Hash, Keypair};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::mutation::Mutation;
use crate::sponsor_vault::SponsorVault;
use crate::stage_vault::StageVault;
use crate::vault::{HashUint64Vault, HashVault};
use crate::wallet::WalletStore;

/// Geometry of the hashed-bucket stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreConfig {
    /// The stores are partitioned into `2^bits_for_bucket` primary buckets.
    pub bits_for_bucket: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { bits_for_bucket: 8 }
    }
}

/// Parameters of the genesis state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub caption: String,
    pub balance: u64,
    pub store: StoreConfig,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            caption: "Aereum Network Genesis".into(),
            balance: 1_000_000,
            store: StoreConfig::default(),
        }
    }
}

/// Committed ledger state at some epoch. Mutated only through
/// [`State::advance_epoch`]; within a block, reads go through the validator
/// facade which overlays a pending [`Mutation`].
pub struct State {
    epoch: u64,
    pub members: HashVault,
    pub captions: HashVault,
    pub wallets: WalletStore,
    pub deposits: WalletStore,
    pub stages: StageVault,
    pub sponsor_offers: HashUint64Vault,
    pub sponsor_granted: SponsorVault,
    pub power_of_attorney: HashVault,
    pub ephemeral_tokens: HashUint64Vault,
    sponsor_expire: HashMap<u64, Vec<Hash>>,
    ephemeral_expire: HashMap<u64, Vec<Hash>>,
}

impl State {
    /// A fresh state at epoch zero holding one member (the returned key),
    /// the genesis caption and the initial balance.
    pub async fn genesis(config: GenesisConfig) -> (Self, Keypair) {
        let bits = config.store.bits_for_bucket;
        let state = Self {
            epoch: 0,
            members: HashVault::start("members", bits),
            captions: HashVault::start("captions", bits),
            wallets: WalletStore::start("wallets", bits),
            deposits: WalletStore::start("deposits", bits),
            stages: StageVault::start("stages", bits),
            sponsor_offers: HashUint64Vault::start("sponsoroffer", bits),
            sponsor_granted: SponsorVault::start("sponsor", bits),
            power_of_attorney: HashVault::start("poa", bits),
            ephemeral_tokens: HashUint64Vault::start("ephemeral", bits),
            sponsor_expire: HashMap::new(),
            ephemeral_expire: HashMap::new(),
        };
        let keypair = Keypair::generate();
        let token = keypair.public_key();
        state.members.insert_token(&token).await;
        state
            .captions
            .insert(Hash::of(config.caption.as_bytes()))
            .await;
        state.wallets.credit_token(&token, config.balance).await;
        info!(balance = config.balance, "genesis state created");
        (state, keypair)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Merge a block's overlay into the committed stores, in a fixed order:
    /// debits before credits, removals before insertions, stage creations
    /// before stage updates.
    pub async fn incorporate(&mut self, mutation: &Mutation) {
        for (hash, delta) in &mutation.delta_wallets {
            if *delta < 0 {
                self.wallets.debit(*hash, delta.unsigned_abs()).await;
            }
        }
        for (hash, delta) in &mutation.delta_wallets {
            if *delta > 0 {
                self.wallets.credit(*hash, *delta as u64).await;
            }
        }
        for (hash, delta) in &mutation.delta_deposits {
            if *delta < 0 {
                self.deposits.debit(*hash, delta.unsigned_abs()).await;
            }
        }
        for (hash, delta) in &mutation.delta_deposits {
            if *delta > 0 {
                self.deposits.credit(*hash, *delta as u64).await;
            }
        }

        for hash in &mutation.use_spn_offer {
            self.sponsor_offers.remove(hash).await;
        }
        for hash in &mutation.publish_spn {
            self.sponsor_granted.remove(hash).await;
        }
        for hash in &mutation.revoke_power {
            self.power_of_attorney.remove(hash).await;
        }

        for hash in &mutation.new_members {
            self.members.insert(*hash).await;
        }
        for hash in &mutation.new_captions {
            self.captions.insert(*hash).await;
        }
        for hash in &mutation.grant_power {
            self.power_of_attorney.insert(*hash).await;
        }
        for (hash, expire) in &mutation.new_spn_offers {
            // offers already consumed this block never reach the store
            if mutation.use_spn_offer.contains(hash) {
                continue;
            }
            self.sponsor_offers.insert(*hash, *expire).await;
            self.sponsor_expire.entry(*expire).or_default().push(*hash);
        }
        for (hash, content_hash) in &mutation.grant_sponsor {
            if mutation.publish_spn.contains(hash) {
                continue;
            }
            self.sponsor_granted.set_content_hash(*hash, content_hash).await;
        }
        for (hash, expire) in &mutation.new_ephemeral {
            self.ephemeral_tokens.insert(*hash, *expire).await;
            self.ephemeral_expire.entry(*expire).or_default().push(*hash);
        }

        for (hash, keys) in &mutation.new_stages {
            if mutation.stage_updates.contains_key(hash) {
                continue;
            }
            self.stages.set_keys(*hash, keys).await;
        }
        for (hash, keys) in &mutation.stage_updates {
            self.stages.set_keys(*hash, keys).await;
        }
    }

    /// Cross the boundary into the next epoch: sweep entries expiring at
    /// the closing epoch, merge the block overlay, increment the counter.
    /// Entries expire at the first epoch strictly greater than their
    /// recorded expiry.
    pub async fn advance_epoch(&mut self, mutation: &Mutation) {
        let closing = self.epoch;
        if let Some(expired) = self.sponsor_expire.remove(&closing) {
            for hash in expired {
                self.sponsor_offers.remove(&hash).await;
            }
        }
        if let Some(expired) = self.ephemeral_expire.remove(&closing) {
            for hash in expired {
                self.ephemeral_tokens.remove(&hash).await;
            }
        }
        self.incorporate(mutation).await;
        self.epoch += 1;
        debug!(epoch = self.epoch, "advanced epoch");
    }

    /// Stop every vault task. Pending queries are answered with failure.
    pub async fn shutdown(self) -> bool {
        let mut all = true;
        all &= self.members.stop().await;
        all &= self.captions.stop().await;
        all &= self.wallets.stop().await;
        all &= self.deposits.stop().await;
        all &= self.stages.stop().await;
        all &= self.sponsor_offers.stop().await;
        all &= self.sponsor_granted.stop().await;
        all &= self.power_of_attorney.stop().await;
        all &= self.ephemeral_tokens.stop().await;
        all
    }
}
