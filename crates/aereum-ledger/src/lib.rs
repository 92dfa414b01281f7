//! # Aereum Ledger
//!
//! The block-building facade over the Aereum core: it unifies committed
//! state and the pending block overlay into the validator surface the
//! instruction kinds consume, and drives the epoch lifecycle.
//!
//! ```no_run
//! use aereum_ledger::{BlockBuilder, GenesisConfig, State};
//!
//! # async fn build() {
//! let (mut state, _genesis_key) = State::genesis(GenesisConfig::default()).await;
//! let mut builder = BlockBuilder::new(&state);
//! // builder.push_bytes(&instruction_bytes).await ...
//! let block = builder.seal();
//! state.advance_epoch(&block.mutations).await;
//! # }
//! ```

pub mod block;
pub mod error;
pub mod validator;

pub use aereum_state::{GenesisConfig, State, StoreConfig};
pub use block::{Block, BlockBuilder};
pub use error::BlockError;
pub use validator::MutatingState;
