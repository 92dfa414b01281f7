//! The wire codec: little-endian field encoders and a checked reader.
//!
//! Every serialized instruction is a flat byte string. Integers are
//! little-endian; strings and byte arrays carry a u16 length prefix;
//! token-cipher lists carry a u16 count. Signatures, tokens and hashes use
//! their natural fixed width.

use crate::crypto::{Hash, Signature, Token, SIGNATURE_SIZE, TOKEN_SIZE};
use crate::stage::TokenCipher;
use thiserror::Error;

/// Decoding failures. Any of these collapses the instruction to "absent".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEnd(usize),

    #[error("malformed boolean byte {0:#04x}")]
    MalformedBool(u8),

    #[error("invalid utf-8 in string field")]
    MalformedString,

    #[error("{0} trailing bytes after last field")]
    TrailingBytes(usize),
}

// ─────────────────────────────────────────────────────────────────────────
// Writers
// ─────────────────────────────────────────────────────────────────────────

pub fn put_byte(value: u8, buf: &mut Vec<u8>) {
    buf.push(value);
}

pub fn put_bool(value: bool, buf: &mut Vec<u8>) {
    buf.push(u8::from(value));
}

pub fn put_u16(value: u16, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u64(value: u64, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_token(token: &Token, buf: &mut Vec<u8>) {
    buf.extend_from_slice(token.as_bytes());
}

pub fn put_hash(hash: &Hash, buf: &mut Vec<u8>) {
    buf.extend_from_slice(hash.as_bytes());
}

pub fn put_signature(signature: &Signature, buf: &mut Vec<u8>) {
    buf.extend_from_slice(signature.as_bytes());
}

/// Length-prefixed byte array. Content beyond u16::MAX bytes is truncated to
/// the prefix width; callers bound their payloads.
pub fn put_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    let len = bytes.len().min(u16::MAX as usize);
    put_u16(len as u16, buf);
    buf.extend_from_slice(&bytes[..len]);
}

pub fn put_string(s: &str, buf: &mut Vec<u8>) {
    put_bytes(s.as_bytes(), buf);
}

/// Count-prefixed token-cipher list; each element is a token followed by a
/// length-prefixed cipher payload.
pub fn put_token_ciphers(list: &[TokenCipher], buf: &mut Vec<u8>) {
    put_u16(list.len() as u16, buf);
    for tc in list {
        put_token(&tc.token, buf);
        put_bytes(&tc.cipher, buf);
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Reader
// ─────────────────────────────────────────────────────────────────────────

/// A checked cursor over a serialized instruction.
///
/// Getters advance the cursor and fail on truncation. `prefix()` exposes the
/// bytes consumed so far, which is exactly what each embedded signature was
/// computed over.
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// All bytes consumed so far.
    pub fn prefix(&self) -> &'a [u8] {
        &self.data[..self.pos]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.pos + n > self.data.len() {
            return Err(WireError::UnexpectedEnd(self.pos));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn byte(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool_flag(&mut self) -> Result<bool, WireError> {
        match self.byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::MalformedBool(other)),
        }
    }

    pub fn u16(&mut self) -> Result<u16, WireError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn u64(&mut self) -> Result<u64, WireError> {
        let bytes = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(arr))
    }

    pub fn token(&mut self) -> Result<Token, WireError> {
        let bytes = self.take(TOKEN_SIZE)?;
        let mut arr = [0u8; TOKEN_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Token::from_bytes(arr))
    }

    pub fn hash(&mut self) -> Result<Hash, WireError> {
        let bytes = self.take(32)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Hash::from_bytes(arr))
    }

    pub fn signature(&mut self) -> Result<Signature, WireError> {
        let bytes = self.take(SIGNATURE_SIZE)?;
        let mut arr = [0u8; SIGNATURE_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Signature::from_bytes(arr))
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.u16()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn string(&mut self) -> Result<String, WireError> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes).map_err(|_| WireError::MalformedString)
    }

    pub fn token_ciphers(&mut self) -> Result<Vec<TokenCipher>, WireError> {
        let count = self.u16()? as usize;
        let mut list = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let token = self.token()?;
            let cipher = self.bytes()?;
            list.push(TokenCipher { token, cipher });
        }
        Ok(list)
    }

    /// Reject trailing bytes after the last declared field.
    pub fn finish(self) -> Result<(), WireError> {
        let left = self.data.len() - self.pos;
        if left != 0 {
            return Err(WireError::TrailingBytes(left));
        }
        Ok(())
    }
}
