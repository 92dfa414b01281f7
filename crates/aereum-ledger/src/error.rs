//! Error type for block building.

use aereum_instructions::{ParseError, ValidationError};
use thiserror::Error;

/// Why an instruction did not make it into the block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("malformed instruction: {0}")]
    Parse(#[from] ParseError),

    #[error("rejected instruction: {0}")]
    Validation(#[from] ValidationError),
}
