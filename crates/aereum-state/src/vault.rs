//! Typed vaults over the hash store: a presence-only set and an expiring
//! hash→u64 map.
//!
//! Param encodings are the store protocol: an empty param on a presence set
//! asks "contains?"; otherwise byte 0 selects the operation (0 = exists,
//! 1 = insert, 2 = delete), with the insert value, where one exists,
//! following as 8 little-endian bytes.

use aereum_core::{Hash, Token};

use crate::store::{HashStore, OpOutcome, QueryResult, StoreHandle, StoreOp};

pub(crate) const OP_EXISTS: u8 = 0;
pub(crate) const OP_INSERT: u8 = 1;
pub(crate) const OP_DELETE: u8 = 2;

/// Presence set operation: 32-byte items, key only.
pub(crate) fn presence_op(
    found: bool,
    hash: &Hash,
    item: &mut [u8],
    param: &[u8],
) -> (OpOutcome, QueryResult) {
    if param.is_empty() {
        return (
            OpOutcome::Nothing,
            if found {
                QueryResult::found()
            } else {
                QueryResult::miss()
            },
        );
    }
    match (param[0], found) {
        (OP_INSERT, false) => {
            item[..32].copy_from_slice(hash.as_bytes());
            (OpOutcome::Added, QueryResult::found())
        }
        (OP_INSERT, true) => (OpOutcome::Nothing, QueryResult::miss()),
        (OP_DELETE, true) => (OpOutcome::Deleted, QueryResult::found()),
        _ => (OpOutcome::Nothing, QueryResult::miss()),
    }
}

/// hash→u64 operation: 40-byte items, key plus little-endian value.
pub(crate) fn uint64_op(
    found: bool,
    hash: &Hash,
    item: &mut [u8],
    param: &[u8],
) -> (OpOutcome, QueryResult) {
    if param.is_empty() {
        return (OpOutcome::Nothing, QueryResult::miss());
    }
    match (param[0], found) {
        (OP_EXISTS, true) => (OpOutcome::Nothing, QueryResult::hit(item[32..40].to_vec())),
        (OP_EXISTS, false) => (OpOutcome::Nothing, QueryResult::miss()),
        (OP_INSERT, false) if param.len() == 9 => {
            item[..32].copy_from_slice(hash.as_bytes());
            item[32..40].copy_from_slice(&param[1..9]);
            (OpOutcome::Added, QueryResult::found())
        }
        (OP_INSERT, true) => (OpOutcome::Nothing, QueryResult::miss()),
        (OP_DELETE, true) => (OpOutcome::Deleted, QueryResult::found()),
        _ => (OpOutcome::Nothing, QueryResult::miss()),
    }
}

/// A presence-only set of hashes (members, captions, powers of attorney).
#[derive(Clone)]
pub struct HashVault {
    handle: StoreHandle,
}

impl HashVault {
    pub fn start(name: &'static str, bits_for_bucket: u32) -> Self {
        Self {
            handle: HashStore::start(name, 32, bits_for_bucket, presence_op as StoreOp),
        }
    }

    pub async fn contains(&self, hash: &Hash) -> bool {
        self.handle.query(*hash, Vec::new()).await.ok
    }

    /// Insert; `false` if already present.
    pub async fn insert(&self, hash: Hash) -> bool {
        self.handle.query(hash, vec![OP_INSERT]).await.ok
    }

    pub async fn insert_token(&self, token: &Token) -> bool {
        self.insert(Hash::of_token(token)).await
    }

    /// Remove; `false` if absent.
    pub async fn remove(&self, hash: &Hash) -> bool {
        self.handle.query(*hash, vec![OP_DELETE]).await.ok
    }

    pub async fn stop(&self) -> bool {
        self.handle.stop().await
    }
}

/// An expiring hash→u64 map (sponsorship offers, ephemeral tokens).
#[derive(Clone)]
pub struct HashUint64Vault {
    handle: StoreHandle,
}

impl HashUint64Vault {
    pub fn start(name: &'static str, bits_for_bucket: u32) -> Self {
        Self {
            handle: HashStore::start(name, 40, bits_for_bucket, uint64_op as StoreOp),
        }
    }

    /// The stored value; zero means absent.
    pub async fn get(&self, hash: &Hash) -> u64 {
        let result = self.handle.query(*hash, vec![OP_EXISTS]).await;
        if !result.ok || result.data.len() != 8 {
            return 0;
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&result.data);
        u64::from_le_bytes(arr)
    }

    /// Insert; `false` if the hash is already bound.
    pub async fn insert(&self, hash: Hash, value: u64) -> bool {
        let mut param = Vec::with_capacity(9);
        param.push(OP_INSERT);
        param.extend_from_slice(&value.to_le_bytes());
        self.handle.query(hash, param).await.ok
    }

    pub async fn remove(&self, hash: &Hash) -> bool {
        self.handle.query(*hash, vec![OP_DELETE]).await.ok
    }

    pub async fn stop(&self) -> bool {
        self.handle.stop().await
    }
}
