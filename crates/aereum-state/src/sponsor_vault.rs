//! The sponsor-grant vault: hash(author || stage) → authorized content hash.
//!
//! Param protocol: `[0]` get, `[1, content_hash]` set (a present entry is a
//! conflict — a pair holds at most one live grant), `[2]` remove. A
//! published sponsored content consumes the grant by removing it.

use aereum_core::Hash;

use crate::store::{HashStore, OpOutcome, QueryResult, StoreHandle, StoreOp};

const OP_GET: u8 = 0;
const OP_SET: u8 = 1;
const OP_REMOVE: u8 = 2;

fn sponsor_op(found: bool, hash: &Hash, item: &mut [u8], param: &[u8]) -> (OpOutcome, QueryResult) {
    if param.is_empty() {
        return (OpOutcome::Nothing, QueryResult::miss());
    }
    match (param[0], found) {
        (OP_GET, true) => (OpOutcome::Nothing, QueryResult::hit(item[32..64].to_vec())),
        (OP_GET, false) => (OpOutcome::Nothing, QueryResult::miss()),
        (OP_SET, false) if param.len() == 33 => {
            item[..32].copy_from_slice(hash.as_bytes());
            item[32..64].copy_from_slice(&param[1..33]);
            (OpOutcome::Added, QueryResult::found())
        }
        (OP_SET, true) => (OpOutcome::Nothing, QueryResult::miss()),
        (OP_REMOVE, true) => (OpOutcome::Deleted, QueryResult::found()),
        _ => (OpOutcome::Nothing, QueryResult::miss()),
    }
}

#[derive(Clone)]
pub struct SponsorVault {
    handle: StoreHandle,
}

impl SponsorVault {
    pub fn start(name: &'static str, bits_for_bucket: u32) -> Self {
        Self {
            handle: HashStore::start(name, 64, bits_for_bucket, sponsor_op as StoreOp),
        }
    }

    pub async fn get_content_hash(&self, hash: &Hash) -> Option<Hash> {
        let result = self.handle.query(*hash, vec![OP_GET]).await;
        if !result.ok || result.data.len() != 32 {
            return None;
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&result.data);
        Some(Hash::from_bytes(arr))
    }

    /// Record a grant; `false` if the pair already holds one.
    pub async fn set_content_hash(&self, hash: Hash, content_hash: &Hash) -> bool {
        let mut param = Vec::with_capacity(33);
        param.push(OP_SET);
        param.extend_from_slice(content_hash.as_bytes());
        self.handle.query(hash, param).await.ok
    }

    /// Consume a grant; `false` if absent.
    pub async fn remove(&self, hash: &Hash) -> bool {
        self.handle.query(*hash, vec![OP_REMOVE]).await.ok
    }

    pub async fn stop(&self) -> bool {
        self.handle.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grant_is_unique_per_pair() {
        let vault = SponsorVault::start("sponsor-test", 4);
        let pair = Hash::of(b"author-stage");
        let content = Hash::of(b"the content");

        assert_eq!(vault.get_content_hash(&pair).await, None);
        assert!(vault.set_content_hash(pair, &content).await);
        assert!(!vault.set_content_hash(pair, &Hash::of(b"other")).await);
        assert_eq!(vault.get_content_hash(&pair).await, Some(content));
    }

    #[tokio::test]
    async fn publishing_consumes_the_grant() {
        let vault = SponsorVault::start("sponsor-consume", 4);
        let pair = Hash::of(b"author-stage");
        assert!(vault.set_content_hash(pair, &Hash::of(b"c")).await);
        assert!(vault.remove(&pair).await);
        assert!(!vault.remove(&pair).await);
        assert_eq!(vault.get_content_hash(&pair).await, None);
    }
}
