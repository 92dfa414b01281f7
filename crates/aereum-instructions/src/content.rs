//! Content: the primitive digital interaction of the protocol.
//!
//! Content is published on a stage, either directly (submission signature
//! verified with the stage's submission key, optionally countersigned by a
//! moderator) or as a sponsored publication consuming a previously granted
//! sponsorship. The payload may be encrypted by the edge; the core carries
//! the bytes verbatim.

use aereum_core::{wire, Hash, Keypair, Signature, Token, WireReader};
use bytes::Bytes;

use crate::error::{ParseError, ValidationError};
use crate::parse::{check_attorney, check_wallet_signature, fee_payer};
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

/// Offset of the submission MAC inside the sub bulk: the `[version, kind]`
/// header and the epoch stamp are excluded so a submission is not forced to
/// be re-signed when re-broadcast across epochs.
const SUB_BULK_MAC_OFFSET: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub epoch_stamp: u64,
    /// Epoch the author claims to have published at. Must equal the stamp
    /// unless the content is moderated.
    pub published: u64,
    pub author: Token,
    pub stage: Token,
    pub content_type: String,
    pub content: Bytes,
    pub hash: Vec<u8>,
    pub sponsored: bool,
    pub encrypted: bool,
    pub sub_signature: Signature,
    pub moderator: Token,
    pub mod_signature: Signature,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl Content {
    /// Partial serialization up to the `encrypted` field.
    fn serialize_sub_bulk(&self) -> Vec<u8> {
        let mut bytes = vec![crate::CURRENT_VERSION, InstructionKind::Content.tag()];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_u64(self.published, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_token(&self.stage, &mut bytes);
        wire::put_string(&self.content_type, &mut bytes);
        wire::put_bytes(&self.content, &mut bytes);
        wire::put_bytes(&self.hash, &mut bytes);
        wire::put_bool(self.sponsored, &mut bytes);
        wire::put_bool(self.encrypted, &mut bytes);
        bytes
    }

    /// Partial serialization up to the `moderator` field.
    fn serialize_mod_bulk(&self) -> Vec<u8> {
        let mut bytes = self.serialize_sub_bulk();
        wire::put_signature(&self.sub_signature, &mut bytes);
        wire::put_token(&self.moderator, &mut bytes);
        bytes
    }

    /// Partial serialization up to the `attorney` field.
    fn serialize_sign_bulk(&self) -> Vec<u8> {
        let mut bytes = self.serialize_mod_bulk();
        wire::put_signature(&self.mod_signature, &mut bytes);
        wire::put_token(&self.attorney, &mut bytes);
        bytes
    }

    /// Partial serialization up to the `fee` field.
    fn serialize_wallet_bulk(&self) -> Vec<u8> {
        let mut bytes = self.serialize_sign_bulk();
        wire::put_signature(&self.signature, &mut bytes);
        wire::put_token(&self.wallet, &mut bytes);
        wire::put_u64(self.fee, &mut bytes);
        bytes
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = self.serialize_wallet_bulk();
        wire::put_signature(&self.wallet_signature, &mut bytes);
        bytes
    }

    /// Sign the submission bulk with the stage's submission key.
    pub fn submit_sign(&mut self, key: &Keypair) {
        let bulk = self.serialize_sub_bulk();
        self.sub_signature = key.sign(&bulk[SUB_BULK_MAC_OFFSET..]);
    }

    /// Countersign the moderation bulk with the stage's moderation key.
    pub fn moderate_sign(&mut self, moderator: Token, key: &Keypair) {
        self.moderator = moderator;
        self.mod_signature = key.sign(&self.serialize_mod_bulk());
    }

    pub fn sign(&mut self, key: &Keypair, attorney: Token) {
        self.attorney = attorney;
        self.signature = key.sign(&self.serialize_sign_bulk());
    }

    /// Whoever must have produced the author signature: the attorney when
    /// delegated, else the moderator of a moderated publication, else the
    /// author.
    fn signing_principal(&self) -> Token {
        if !self.attorney.is_zero() {
            return self.attorney;
        }
        if !self.moderator.is_zero() {
            return self.moderator;
        }
        self.author
    }

    pub fn pay_fee(&mut self, fee: u64, wallet: &Keypair) {
        let token = wallet.public_key();
        self.wallet = if token == self.signing_principal() {
            Token::ZERO
        } else {
            token
        };
        self.fee = fee;
        self.wallet_signature = wallet.sign(&self.serialize_wallet_bulk());
    }

    pub fn payments(&self) -> Payment {
        Payment::new_debit(
            fee_payer(&self.wallet, &self.attorney, &self.author),
            self.fee,
        )
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(data);
        let epoch_stamp = crate::parse::read_header(&mut reader, InstructionKind::Content)?;
        let published = reader.u64()?;
        let author = reader.token()?;
        let stage = reader.token()?;
        let content_type = reader.string()?;
        let content = Bytes::from(reader.bytes()?);
        let hash = reader.bytes()?;
        let sponsored = reader.bool_flag()?;
        let encrypted = reader.bool_flag()?;
        let sub_signature = reader.signature()?;
        let moderator = reader.token()?;
        let mod_signature = reader.signature()?;
        if moderator.is_zero() && epoch_stamp != published {
            return Err(ParseError::PublishedMismatch);
        }
        let attorney = reader.token()?;
        let message = reader.prefix();
        let signature = reader.signature()?;
        let principal = if !attorney.is_zero() {
            attorney
        } else if !moderator.is_zero() {
            moderator
        } else {
            author
        };
        if !principal.verify(message, &signature) {
            return Err(ParseError::BadSignature("author"));
        }
        let wallet = reader.token()?;
        let fee = reader.u64()?;
        let message = reader.prefix();
        let wallet_signature = reader.signature()?;
        if !check_wallet_signature(message, &wallet_signature, &wallet, &principal, &author) {
            return Err(ParseError::BadSignature("wallet"));
        }
        reader.finish()?;
        Ok(Self {
            epoch_stamp,
            published,
            author,
            stage,
            content_type,
            content,
            hash,
            sponsored,
            encrypted,
            sub_signature,
            moderator,
            mod_signature,
            attorney,
            signature,
            wallet,
            fee,
            wallet_signature,
        })
    }

    pub(crate) async fn validate(
        &self,
        v: &mut (dyn InstructionValidator + '_),
    ) -> Result<(), ValidationError> {
        if !v.has_member(&Hash::of_token(&self.author)).await {
            return Err(ValidationError::UnknownPrincipal("author"));
        }
        check_attorney(&*v, &self.author, &self.attorney).await?;
        let stage_hash = Hash::of_token(&self.stage);
        let keys = v
            .get_audience_keys(&stage_hash)
            .await
            .ok_or(ValidationError::UnknownPrincipal("stage"))?;
        let payments = self.payments();

        if self.sponsored {
            // Sponsored publications are plaintext and carry no stage
            // signatures; the grant recorded at acceptance time is the only
            // authorization, and it is consumed here.
            if self.encrypted {
                return Err(ValidationError::Conflict("encrypted sponsored content"));
            }
            if !self.sub_signature.is_zero()
                || !self.mod_signature.is_zero()
                || !self.moderator.is_zero()
            {
                return Err(ValidationError::Conflict("signed sponsored content"));
            }
            let grant_hash = Hash::of_pair(&self.author, &self.stage);
            let content_hash = v
                .has_granted_sponsor(&grant_hash)
                .await
                .ok_or(ValidationError::UnknownPrincipal("sponsor grant"))?;
            if Hash::of(&self.content) != content_hash {
                return Err(ValidationError::Conflict("sponsored content hash"));
            }
            if !v.set_publish_sponsor(grant_hash).await {
                return Err(ValidationError::Conflict("sponsor grant"));
            }
            if !v.can_pay(&payments).await {
                return Err(ValidationError::InsufficientFunds);
            }
            v.add_fee_collected(self.fee);
            return Ok(());
        }

        if !keys.submit.is_zero() {
            let bulk = self.serialize_sub_bulk();
            if !keys
                .submit
                .verify(&bulk[SUB_BULK_MAC_OFFSET..], &self.sub_signature)
            {
                return Err(ValidationError::BadSignature("submission"));
            }
        }
        if !self.moderator.is_zero() {
            if keys.moderate.is_zero() {
                return Err(ValidationError::UnknownPrincipal("moderation key"));
            }
            if !keys
                .moderate
                .verify(&self.serialize_mod_bulk(), &self.mod_signature)
            {
                return Err(ValidationError::BadSignature("moderation"));
            }
        }
        if !v.can_pay(&payments).await {
            return Err(ValidationError::InsufficientFunds);
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsigned(author: &Keypair, stage: Token) -> Content {
        Content {
            epoch_stamp: 11,
            published: 11,
            author: author.public_key(),
            stage,
            content_type: "text/plain".into(),
            content: Bytes::from_static(b"first post"),
            hash: Hash::of(b"first post").as_bytes().to_vec(),
            sponsored: false,
            encrypted: false,
            sub_signature: Signature::ZERO,
            moderator: Token::ZERO,
            mod_signature: Signature::ZERO,
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        }
    }

    #[test]
    fn roundtrip_unmoderated() {
        let author = Keypair::from_seed(&[50; 32]);
        let submit_key = Keypair::from_seed(&[51; 32]);
        let mut content = unsigned(&author, Token::from_bytes([52; 32]));
        content.submit_sign(&submit_key);
        content.sign(&author, Token::ZERO);
        content.pay_fee(4, &author);
        let parsed = Content::parse(&content.serialize()).unwrap();
        assert_eq!(parsed, content);
    }

    #[test]
    fn roundtrip_moderated() {
        let author = Keypair::from_seed(&[50; 32]);
        let submit_key = Keypair::from_seed(&[51; 32]);
        let mod_key = Keypair::from_seed(&[53; 32]);
        let mut content = unsigned(&author, Token::from_bytes([52; 32]));
        // moderated content may publish later than it was submitted
        content.published = 9;
        content.submit_sign(&submit_key);
        content.moderate_sign(mod_key.public_key(), &mod_key);
        content.sign(&mod_key, Token::ZERO);
        content.pay_fee(4, &mod_key);
        let parsed = Content::parse(&content.serialize()).unwrap();
        assert_eq!(parsed, content);
    }

    #[test]
    fn unmoderated_published_mismatch_is_rejected() {
        let author = Keypair::from_seed(&[50; 32]);
        let mut content = unsigned(&author, Token::from_bytes([52; 32]));
        content.published = 10;
        content.sign(&author, Token::ZERO);
        content.pay_fee(0, &author);
        assert_eq!(
            Content::parse(&content.serialize()),
            Err(ParseError::PublishedMismatch)
        );
    }

    #[test]
    fn submission_mac_skips_epoch_stamp() {
        let author = Keypair::from_seed(&[50; 32]);
        let submit_key = Keypair::from_seed(&[51; 32]);
        let mut content = unsigned(&author, Token::from_bytes([52; 32]));
        content.submit_sign(&submit_key);
        let original = content.sub_signature;

        // re-stamping the epoch does not invalidate the submission MAC
        content.epoch_stamp = 99;
        content.published = 99;
        let bulk = content.serialize_sub_bulk();
        assert!(submit_key
            .public_key()
            .verify(&bulk[SUB_BULK_MAC_OFFSET..], &original));
    }

    #[test]
    fn flipped_wallet_bulk_fails_only_wallet_signature() {
        let author = Keypair::from_seed(&[50; 32]);
        let submit_key = Keypair::from_seed(&[51; 32]);
        let mut content = unsigned(&author, Token::from_bytes([52; 32]));
        content.submit_sign(&submit_key);
        content.sign(&author, Token::ZERO);
        content.pay_fee(4, &author);

        let mut bytes = content.serialize();
        // flip a bit in the fee field, after the author signature
        let fee_offset = bytes.len() - 64 - 8;
        bytes[fee_offset] ^= 0x01;
        assert_eq!(
            Content::parse(&bytes),
            Err(ParseError::BadSignature("wallet"))
        );
    }
}
