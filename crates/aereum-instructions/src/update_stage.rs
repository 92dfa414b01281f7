//! UpdateStage: replace a stage's submission and moderation keys.
//!
//! The stage token itself never changes. The instruction carries the new
//! key material encrypted to the current members (read, submit and moderate
//! cipher lists) and is authorized by a stage-admin signature made with the
//! stage's own token key over the stage bulk.

use aereum_core::{wire, Hash, Keypair, Signature, StageKeys, Token, TokenCipher, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::parse::{
    check_attorney, check_signature, check_wallet_signature, fee_payer, read_chain_header,
};
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStage {
    pub epoch_stamp: u64,
    pub author: Token,
    /// Existing stage token; identifies the stage and never changes.
    pub stage: Token,
    /// New submission key.
    pub submission: Token,
    /// New moderation key.
    pub moderation: Token,
    pub flag: u8,
    pub description: String,
    pub read_members: Vec<TokenCipher>,
    pub sub_members: Vec<TokenCipher>,
    pub mod_members: Vec<TokenCipher>,
    pub stage_signature: Signature,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl UpdateStage {
    fn serialize_stage_sign(&self) -> Vec<u8> {
        let mut bytes = vec![crate::CURRENT_VERSION, InstructionKind::UpdateStage.tag()];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_token(&self.stage, &mut bytes);
        wire::put_token(&self.submission, &mut bytes);
        wire::put_token(&self.moderation, &mut bytes);
        wire::put_byte(self.flag, &mut bytes);
        wire::put_string(&self.description, &mut bytes);
        wire::put_token_ciphers(&self.read_members, &mut bytes);
        wire::put_token_ciphers(&self.sub_members, &mut bytes);
        wire::put_token_ciphers(&self.mod_members, &mut bytes);
        bytes
    }

    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = self.serialize_stage_sign();
        wire::put_signature(&self.stage_signature, &mut bytes);
        wire::put_token(&self.attorney, &mut bytes);
        bytes
    }

    fn serialize_wallet_sign(&self) -> Vec<u8> {
        let mut bytes = self.serialize_sign();
        wire::put_signature(&self.signature, &mut bytes);
        wire::put_token(&self.wallet, &mut bytes);
        wire::put_u64(self.fee, &mut bytes);
        bytes
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = self.serialize_wallet_sign();
        wire::put_signature(&self.wallet_signature, &mut bytes);
        bytes
    }

    /// Sign the stage bulk with the stage token's key.
    pub fn stage_sign(&mut self, key: &Keypair) {
        self.stage_signature = key.sign(&self.serialize_stage_sign());
    }

    pub fn sign(&mut self, key: &Keypair, attorney: Token) {
        self.attorney = attorney;
        self.signature = key.sign(&self.serialize_sign());
    }

    pub fn pay_fee(&mut self, fee: u64, wallet: &Keypair) {
        let token = wallet.public_key();
        let principal = if self.attorney.is_zero() {
            self.author
        } else {
            self.attorney
        };
        self.wallet = if token == principal { Token::ZERO } else { token };
        self.fee = fee;
        self.wallet_signature = wallet.sign(&self.serialize_wallet_sign());
    }

    /// The replacement key set.
    pub fn stage_keys(&self) -> StageKeys {
        StageKeys {
            moderate: self.moderation,
            submit: self.submission,
            stage: self.stage,
            flag: self.flag,
        }
    }

    pub fn payments(&self) -> Payment {
        Payment::new_debit(
            fee_payer(&self.wallet, &self.attorney, &self.author),
            self.fee,
        )
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(data);
        let (epoch_stamp, author) = read_chain_header(&mut reader, InstructionKind::UpdateStage)?;
        let stage = reader.token()?;
        let submission = reader.token()?;
        let moderation = reader.token()?;
        let flag = reader.byte()?;
        let description = reader.string()?;
        let read_members = reader.token_ciphers()?;
        let sub_members = reader.token_ciphers()?;
        let mod_members = reader.token_ciphers()?;
        let stage_signature = reader.signature()?;
        let attorney = reader.token()?;
        let message = reader.prefix();
        let signature = reader.signature()?;
        if !check_signature(message, &signature, &attorney, &author) {
            return Err(ParseError::BadSignature("author"));
        }
        let wallet = reader.token()?;
        let fee = reader.u64()?;
        let message = reader.prefix();
        let wallet_signature = reader.signature()?;
        if !check_wallet_signature(message, &wallet_signature, &wallet, &attorney, &author) {
            return Err(ParseError::BadSignature("wallet"));
        }
        reader.finish()?;
        Ok(Self {
            epoch_stamp,
            author,
            stage,
            submission,
            moderation,
            flag,
            description,
            read_members,
            sub_members,
            mod_members,
            stage_signature,
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
        if !keys
            .stage
            .verify(&self.serialize_stage_sign(), &self.stage_signature)
        {
            return Err(ValidationError::BadSignature("stage"));
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v.update_audience(stage_hash, self.stage_keys()).await {
            return Err(ValidationError::UnknownPrincipal("stage"));
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_member_ciphers() {
        let author = Keypair::from_seed(&[60; 32]);
        let stage_key = Keypair::from_seed(&[61; 32]);
        let mut update = UpdateStage {
            epoch_stamp: 8,
            author: author.public_key(),
            stage: stage_key.public_key(),
            submission: Token::from_bytes([62; 32]),
            moderation: Token::from_bytes([63; 32]),
            flag: 3,
            description: "rotated keys".into(),
            read_members: vec![TokenCipher {
                token: Token::from_bytes([64; 32]),
                cipher: vec![0xaa; 48],
            }],
            sub_members: vec![TokenCipher {
                token: Token::from_bytes([65; 32]),
                cipher: vec![0xbb; 48],
            }],
            mod_members: Vec::new(),
            stage_signature: Signature::ZERO,
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        update.stage_sign(&stage_key);
        update.sign(&author, Token::ZERO);
        update.pay_fee(6, &author);
        let parsed = UpdateStage::parse(&update.serialize()).unwrap();
        assert_eq!(parsed, update);
        assert!(stage_key
            .public_key()
            .verify(&parsed.serialize_stage_sign(), &parsed.stage_signature));
    }
}
