//! The stage vault: hash(stage token) → stage key set.
//!
//! An empty param reads the keys; a non-empty param is the 97-byte encoded
//! key set and writes them, replacing any present entry (UpdateStage) or
//! creating one (CreateStage).

use aereum_core::{Hash, StageKeys, STAGE_KEYS_SIZE};

use crate::store::{HashStore, OpOutcome, QueryResult, StoreHandle, StoreOp};

fn stage_op(found: bool, hash: &Hash, item: &mut [u8], param: &[u8]) -> (OpOutcome, QueryResult) {
    if param.is_empty() {
        return if found {
            (
                OpOutcome::Nothing,
                QueryResult::hit(item[32..32 + STAGE_KEYS_SIZE].to_vec()),
            )
        } else {
            (OpOutcome::Nothing, QueryResult::miss())
        };
    }
    if param.len() != STAGE_KEYS_SIZE {
        return (OpOutcome::Nothing, QueryResult::miss());
    }
    item[..32].copy_from_slice(hash.as_bytes());
    item[32..32 + STAGE_KEYS_SIZE].copy_from_slice(param);
    if found {
        (OpOutcome::Nothing, QueryResult::found())
    } else {
        (OpOutcome::Added, QueryResult::found())
    }
}

#[derive(Clone)]
pub struct StageVault {
    handle: StoreHandle,
}

impl StageVault {
    pub fn start(name: &'static str, bits_for_bucket: u32) -> Self {
        Self {
            handle: HashStore::start(name, 32 + STAGE_KEYS_SIZE, bits_for_bucket, stage_op as StoreOp),
        }
    }

    pub async fn get_keys(&self, hash: &Hash) -> Option<StageKeys> {
        let result = self.handle.query(*hash, Vec::new()).await;
        if !result.ok {
            return None;
        }
        StageKeys::from_bytes(&result.data)
    }

    pub async fn exists(&self, hash: &Hash) -> bool {
        self.handle.query(*hash, Vec::new()).await.ok
    }

    /// Create or replace the key set for a stage.
    pub async fn set_keys(&self, hash: Hash, keys: &StageKeys) -> bool {
        self.handle.query(hash, keys.to_bytes().to_vec()).await.ok
    }

    pub async fn stop(&self) -> bool {
        self.handle.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aereum_core::Token;

    fn keys(byte: u8) -> StageKeys {
        StageKeys {
            moderate: Token::from_bytes([byte; 32]),
            submit: Token::from_bytes([byte + 1; 32]),
            stage: Token::from_bytes([byte + 2; 32]),
            flag: byte,
        }
    }

    #[tokio::test]
    async fn set_then_get() {
        let vault = StageVault::start("stages-test", 4);
        let hash = Hash::of(b"stage");
        assert_eq!(vault.get_keys(&hash).await, None);
        assert!(vault.set_keys(hash, &keys(1)).await);
        assert_eq!(vault.get_keys(&hash).await, Some(keys(1)));
    }

    #[tokio::test]
    async fn set_replaces_existing_keys() {
        let vault = StageVault::start("stages-replace", 4);
        let hash = Hash::of(b"stage");
        assert!(vault.set_keys(hash, &keys(1)).await);
        assert!(vault.set_keys(hash, &keys(7)).await);
        assert_eq!(vault.get_keys(&hash).await, Some(keys(7)));
    }
}
