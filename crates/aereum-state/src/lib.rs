//! # Aereum State
//!
//! The authoritative state store: content-addressed hashed-bucket tables
//! behind a single-writer query protocol, typed vaults over them, and the
//! mutation overlay a block accumulates before commit.
//!
//! Each table is owned by one tokio task serving a bounded request channel
//! in FIFO order; callers are concurrent but never touch table memory. The
//! overlay is a plain value owned by the current block builder.

pub mod bucket;
pub mod mutation;
pub mod sponsor_vault;
pub mod stage_vault;
pub mod state;
pub mod store;
pub mod vault;
pub mod wallet;

pub use bucket::{BucketStore, HEADER_SIZE, ITEMS_PER_BUCKET};
pub use mutation::Mutation;
pub use sponsor_vault::SponsorVault;
pub use stage_vault::StageVault;
pub use state::{GenesisConfig, State, StoreConfig};
pub use store::{HashStore, OpOutcome, QueryResult, StoreHandle};
pub use vault::{HashUint64Vault, HashVault};
pub use wallet::WalletStore;
