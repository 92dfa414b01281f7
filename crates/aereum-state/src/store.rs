//! The single-writer hash store task and its query channel protocol.
//!
//! A store owns a [`BucketStore`] and serves a bounded request channel from
//! a dedicated tokio task: callers are concurrent, only the owner task
//! mutates table memory, and requests are processed strictly in arrival
//! order. Each store is parameterized by an operation function that
//! interprets the query's `param` bytes against the located item.

use aereum_core::Hash;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::bucket::{BucketStore, ITEMS_PER_BUCKET};

const CHANNEL_CAPACITY: usize = 64;

/// What an operation did to the located slot. Item-count bookkeeping stays
/// outside the operation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome {
    Added,
    Deleted,
    Nothing,
}

/// Reply to a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub ok: bool,
    pub data: Vec<u8>,
}

impl QueryResult {
    pub fn hit(data: Vec<u8>) -> Self {
        Self { ok: true, data }
    }

    pub fn found() -> Self {
        Self {
            ok: true,
            data: Vec::new(),
        }
    }

    pub fn miss() -> Self {
        Self {
            ok: false,
            data: Vec::new(),
        }
    }
}

/// Interprets a query against the located item.
///
/// `found` says whether the hash was present; `item` is the full item slot
/// (key plus payload). On insert the operation writes both key and payload
/// into the slot and returns [`OpOutcome::Added`]; returning
/// [`OpOutcome::Deleted`] makes the store zero the slot.
pub type StoreOp = fn(found: bool, hash: &Hash, item: &mut [u8], param: &[u8]) -> (OpOutcome, QueryResult);

enum Request {
    Query {
        hash: Hash,
        param: Vec<u8>,
        respond: oneshot::Sender<QueryResult>,
    },
    Stop {
        respond: oneshot::Sender<bool>,
    },
}

/// A cheaply clonable handle to a running store task.
#[derive(Clone)]
pub struct StoreHandle {
    name: &'static str,
    tx: mpsc::Sender<Request>,
}

impl StoreHandle {
    /// Send a query and wait for the owner task's reply. A stopped store
    /// answers every query with a miss.
    pub async fn query(&self, hash: Hash, param: Vec<u8>) -> QueryResult {
        let (respond, rx) = oneshot::channel();
        if self
            .tx
            .send(Request::Query {
                hash,
                param,
                respond,
            })
            .await
            .is_err()
        {
            return QueryResult::miss();
        }
        rx.await.unwrap_or_else(|_| QueryResult::miss())
    }

    /// Shut the store down. Queued requests are not drained: they are
    /// answered with failure.
    pub async fn stop(&self) -> bool {
        let (respond, rx) = oneshot::channel();
        if self.tx.send(Request::Stop { respond }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The owner task state: table memory, item count and the operation.
pub struct HashStore {
    name: &'static str,
    bits_for_bucket: u32,
    table: BucketStore,
    item_count: u64,
    op: StoreOp,
    rx: mpsc::Receiver<Request>,
}

impl HashStore {
    /// Spawn the owner task and return a handle to it.
    pub fn start(name: &'static str, item_size: usize, bits_for_bucket: u32, op: StoreOp) -> StoreHandle {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let store = Self {
            name,
            bits_for_bucket,
            table: BucketStore::new(item_size, 1usize << bits_for_bucket),
            item_count: 0,
            op,
            rx,
        };
        tokio::spawn(store.run());
        StoreHandle { name, tx }
    }

    async fn run(mut self) {
        debug!(store = self.name, "hash store task started");
        while let Some(request) = self.rx.recv().await {
            match request {
                Request::Query {
                    hash,
                    param,
                    respond,
                } => {
                    let _ = respond.send(self.operate(&hash, &param));
                }
                Request::Stop { respond } => {
                    self.rx.close();
                    while let Some(queued) = self.rx.recv().await {
                        if let Request::Query { respond, .. } = queued {
                            let _ = respond.send(QueryResult::miss());
                        }
                    }
                    debug!(
                        store = self.name,
                        items = self.item_count,
                        "hash store task stopped"
                    );
                    let _ = respond.send(true);
                    return;
                }
            }
        }
    }

    /// Bucket selection: the high `bits_for_bucket` bits of the hash.
    fn bucket_for(&self, hash: &Hash) -> usize {
        if self.bits_for_bucket == 0 {
            return 0;
        }
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_be_bytes(prefix) >> (64 - self.bits_for_bucket)) as usize
    }

    fn operate(&mut self, hash: &Hash, param: &[u8]) -> QueryResult {
        let mut bucket = self.bucket_for(hash);
        let mut free_slot: Option<(usize, usize)> = None;
        loop {
            for slot in 0..ITEMS_PER_BUCKET {
                let key = &self.table.item(bucket, slot)[..32];
                if key == hash.as_bytes() {
                    let (outcome, result) =
                        (self.op)(true, hash, self.table.item_mut(bucket, slot), param);
                    if outcome == OpOutcome::Deleted {
                        self.table.clear_item(bucket, slot);
                        self.item_count -= 1;
                    }
                    return result;
                }
                if free_slot.is_none() && key.iter().all(|&b| b == 0) {
                    free_slot = Some((bucket, slot));
                }
            }
            match self.table.chain(bucket) {
                Some(next) => bucket = next,
                None => break,
            }
        }

        // Not found: let the operation decide whether to insert, writing
        // the prospective item into a scratch slot first.
        let mut scratch = vec![0u8; self.table.item_size()];
        let (outcome, result) = (self.op)(false, hash, &mut scratch, param);
        if outcome == OpOutcome::Added {
            let (target_bucket, target_slot) = match free_slot {
                Some(slot) => slot,
                None => {
                    let spill = self.table.append_overflow();
                    self.table.set_chain(bucket, spill);
                    (spill, 0)
                }
            };
            self.table
                .item_mut(target_bucket, target_slot)
                .copy_from_slice(&scratch);
            self.item_count += 1;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::presence_op;

    #[tokio::test]
    async fn queries_are_served_in_order() {
        let handle = HashStore::start("test", 32, 2, presence_op);
        let hash = Hash::of(b"x");
        assert!(!handle.query(hash, Vec::new()).await.ok);
        assert!(handle.query(hash, vec![1]).await.ok);
        assert!(handle.query(hash, Vec::new()).await.ok);
    }

    #[tokio::test]
    async fn overflow_chains_beyond_six_items() {
        // one primary bucket: every hash collides, forcing spill buckets
        let handle = HashStore::start("overflow", 32, 0, presence_op);
        let hashes: Vec<Hash> = (0u8..20).map(|i| Hash::of(&[i])).collect();
        for hash in &hashes {
            assert!(handle.query(*hash, vec![1]).await.ok);
        }
        for hash in &hashes {
            assert!(handle.query(*hash, Vec::new()).await.ok);
        }
    }

    #[tokio::test]
    async fn deleted_slots_are_reused() {
        let handle = HashStore::start("reuse", 32, 0, presence_op);
        let first = Hash::of(b"first");
        assert!(handle.query(first, vec![1]).await.ok);
        assert!(handle.query(first, vec![2]).await.ok);
        assert!(!handle.query(first, Vec::new()).await.ok);
        // a fresh insert lands in the freed slot
        let second = Hash::of(b"second");
        assert!(handle.query(second, vec![1]).await.ok);
        assert!(handle.query(second, Vec::new()).await.ok);
    }

    #[tokio::test]
    async fn stop_answers_pending_work_with_failure() {
        let handle = HashStore::start("stopping", 32, 2, presence_op);
        let hash = Hash::of(b"y");
        assert!(handle.query(hash, vec![1]).await.ok);
        assert!(handle.stop().await);
        // after stop, queries fail rather than hang
        assert!(!handle.query(hash, Vec::new()).await.ok);
    }
}
