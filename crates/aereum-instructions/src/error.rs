//! Error types for instruction parsing and validation.
//!
//! Parse errors collapse the instruction to "absent": no partial object
//! escapes the parser. Validation errors reject the instruction; the block
//! simply advances without it.

use aereum_core::WireError;
use thiserror::Error;

/// Structural failures while decoding an instruction byte string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("instruction shorter than its two-byte header")]
    MissingHeader,

    #[error("unsupported protocol version {0}")]
    BadVersion(u8),

    #[error("unknown instruction kind tag {0}")]
    UnknownKind(u8),

    #[error("malformed bytes: {0}")]
    Malformed(#[from] WireError),

    #[error("{0} signature verification failed")]
    BadSignature(&'static str),

    #[error("unmoderated content must publish at its epoch stamp")]
    PublishedMismatch,

    #[error("embedded {0} instruction is malformed")]
    MalformedEmbedded(&'static str),
}

/// State-dependent failures while validating a parsed instruction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("stamped for epoch {stamp} beyond current epoch {current}")]
    FutureEpoch { stamp: u64, current: u64 },

    #[error("{0} signature verification failed")]
    BadSignature(&'static str),

    #[error("unknown principal: {0}")]
    UnknownPrincipal(&'static str),

    #[error("payment is not feasible")]
    InsufficientFunds,

    #[error("conflicting entry: {0}")]
    Conflict(&'static str),

    #[error("reference expired at epoch {expire}, current epoch {current}")]
    Expired { expire: u64, current: u64 },
}
