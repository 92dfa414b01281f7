//! Stage key material and member cipher lists.
//!
//! A stage is a publication surface identified by its own token. Submission
//! and moderation roles are optional: the zero token means the role is not
//! required. These are value types shared by the instruction layer and the
//! state layer.

use crate::crypto::{Token, TOKEN_SIZE};
use serde::{Deserialize, Serialize};

/// Encoded width of [`StageKeys`]: three tokens plus the flag byte.
pub const STAGE_KEYS_SIZE: usize = 3 * TOKEN_SIZE + 1;

/// The key set describing a publication surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageKeys {
    /// Moderation key; zero if the stage is unmoderated.
    pub moderate: Token,
    /// Submission key; zero if anyone may submit.
    pub submit: Token,
    /// The stage's own token. Never changes after creation.
    pub stage: Token,
    /// Opaque edge-defined bitfield (encryption/closed/moderated hints).
    /// Carried verbatim.
    pub flag: u8,
}

impl StageKeys {
    /// Fixed-width encoding: `moderate || submit || stage || flag`.
    pub fn to_bytes(&self) -> [u8; STAGE_KEYS_SIZE] {
        let mut out = [0u8; STAGE_KEYS_SIZE];
        out[..TOKEN_SIZE].copy_from_slice(self.moderate.as_bytes());
        out[TOKEN_SIZE..2 * TOKEN_SIZE].copy_from_slice(self.submit.as_bytes());
        out[2 * TOKEN_SIZE..3 * TOKEN_SIZE].copy_from_slice(self.stage.as_bytes());
        out[3 * TOKEN_SIZE] = self.flag;
        out
    }

    /// Decode from the fixed-width layout. Returns `None` on short input.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < STAGE_KEYS_SIZE {
            return None;
        }
        let mut moderate = [0u8; TOKEN_SIZE];
        let mut submit = [0u8; TOKEN_SIZE];
        let mut stage = [0u8; TOKEN_SIZE];
        moderate.copy_from_slice(&bytes[..TOKEN_SIZE]);
        submit.copy_from_slice(&bytes[TOKEN_SIZE..2 * TOKEN_SIZE]);
        stage.copy_from_slice(&bytes[2 * TOKEN_SIZE..3 * TOKEN_SIZE]);
        Some(Self {
            moderate: Token::from_bytes(moderate),
            submit: Token::from_bytes(submit),
            stage: Token::from_bytes(stage),
            flag: bytes[3 * TOKEN_SIZE],
        })
    }
}

/// A key payload encrypted for one stage member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCipher {
    pub token: Token,
    pub cipher: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_keys_roundtrip() {
        let keys = StageKeys {
            moderate: Token::from_bytes([1; 32]),
            submit: Token::from_bytes([2; 32]),
            stage: Token::from_bytes([3; 32]),
            flag: 0xa5,
        };
        let bytes = keys.to_bytes();
        assert_eq!(StageKeys::from_bytes(&bytes), Some(keys));
    }

    #[test]
    fn short_input_is_rejected() {
        assert_eq!(StageKeys::from_bytes(&[0u8; STAGE_KEYS_SIZE - 1]), None);
    }
}
