//! # Aereum Core
//!
//! Shared primitives for the Aereum ledger: cryptographic newtypes, the
//! little-endian wire codec, and stage key material.
//!
//! This crate contains no I/O and no state. It is pure computation over
//! fixed-width cryptographic values, sitting below both the instruction
//! layer and the state layer.

pub mod crypto;
pub mod stage;
pub mod wire;

pub use crypto::{Hash, Keypair, Signature, Token, SIGNATURE_SIZE, TOKEN_SIZE};
pub use stage::{StageKeys, TokenCipher, STAGE_KEYS_SIZE};
pub use wire::{WireError, WireReader};
