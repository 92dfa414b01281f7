//! The wallet store: hash→u64 balances with credit/debit semantics.
//!
//! `credit` inserts or increments; `debit` decrements and deletes the item
//! on reaching zero. Balances never go negative: an uncovered debit fails
//! and leaves the item untouched.

use aereum_core::{Hash, Token};

use crate::store::{HashStore, OpOutcome, QueryResult, StoreHandle, StoreOp};

const OP_BALANCE: u8 = 0;
const OP_CREDIT: u8 = 1;
const OP_DEBIT: u8 = 2;

fn wallet_op(found: bool, hash: &Hash, item: &mut [u8], param: &[u8]) -> (OpOutcome, QueryResult) {
    if param.is_empty() {
        return (OpOutcome::Nothing, QueryResult::miss());
    }
    let value = if param.len() == 9 {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&param[1..9]);
        u64::from_le_bytes(arr)
    } else {
        0
    };
    match (param[0], found) {
        (OP_BALANCE, true) => (OpOutcome::Nothing, QueryResult::hit(item[32..40].to_vec())),
        (OP_BALANCE, false) => (OpOutcome::Nothing, QueryResult::miss()),
        (OP_CREDIT, true) => {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(&item[32..40]);
            let balance = u64::from_le_bytes(arr).saturating_add(value);
            item[32..40].copy_from_slice(&balance.to_le_bytes());
            (OpOutcome::Nothing, QueryResult::found())
        }
        (OP_CREDIT, false) => {
            item[..32].copy_from_slice(hash.as_bytes());
            item[32..40].copy_from_slice(&value.to_le_bytes());
            (OpOutcome::Added, QueryResult::found())
        }
        (OP_DEBIT, true) => {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(&item[32..40]);
            let balance = u64::from_le_bytes(arr);
            if value > balance {
                return (OpOutcome::Nothing, QueryResult::miss());
            }
            if value == balance {
                return (OpOutcome::Deleted, QueryResult::found());
            }
            item[32..40].copy_from_slice(&(balance - value).to_le_bytes());
            (OpOutcome::Nothing, QueryResult::found())
        }
        _ => (OpOutcome::Nothing, QueryResult::miss()),
    }
}

/// Fungible-token balances keyed by account hash.
#[derive(Clone)]
pub struct WalletStore {
    handle: StoreHandle,
}

impl WalletStore {
    pub fn start(name: &'static str, bits_for_bucket: u32) -> Self {
        Self {
            handle: HashStore::start(name, 40, bits_for_bucket, wallet_op as StoreOp),
        }
    }

    /// `(exists, balance)` for the account.
    pub async fn balance(&self, hash: &Hash) -> (bool, u64) {
        let result = self.handle.query(*hash, vec![OP_BALANCE]).await;
        if !result.ok || result.data.len() != 8 {
            return (false, 0);
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&result.data);
        (true, u64::from_le_bytes(arr))
    }

    pub async fn credit(&self, hash: Hash, value: u64) -> bool {
        let mut param = Vec::with_capacity(9);
        param.push(OP_CREDIT);
        param.extend_from_slice(&value.to_le_bytes());
        self.handle.query(hash, param).await.ok
    }

    pub async fn credit_token(&self, token: &Token, value: u64) -> bool {
        self.credit(Hash::of_token(token), value).await
    }

    /// `false` when the balance does not cover the debit.
    pub async fn debit(&self, hash: Hash, value: u64) -> bool {
        let mut param = Vec::with_capacity(9);
        param.push(OP_DEBIT);
        param.extend_from_slice(&value.to_le_bytes());
        self.handle.query(hash, param).await.ok
    }

    pub async fn stop(&self) -> bool {
        self.handle.stop().await
    }
}
