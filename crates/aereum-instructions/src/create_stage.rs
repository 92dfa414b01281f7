//! CreateStage: allocate a new publication surface.

use aereum_core::{wire, Hash, Keypair, Signature, StageKeys, Token, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::parse::{
    check_attorney, check_signature, check_wallet_signature, fee_payer, read_chain_header,
};
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

/// Allocates a stage under a fresh stage token and fixes its initial key
/// set. The stage hash must not be in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStage {
    pub epoch_stamp: u64,
    pub author: Token,
    pub stage: Token,
    pub submission: Token,
    pub moderation: Token,
    pub flag: u8,
    pub description: String,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl CreateStage {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![crate::CURRENT_VERSION, InstructionKind::CreateStage.tag()];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_token(&self.stage, &mut bytes);
        wire::put_token(&self.submission, &mut bytes);
        wire::put_token(&self.moderation, &mut bytes);
        wire::put_byte(self.flag, &mut bytes);
        wire::put_string(&self.description, &mut bytes);
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

    /// The key set this stage is created with.
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
        let (epoch_stamp, author) = read_chain_header(&mut reader, InstructionKind::CreateStage)?;
        let stage = reader.token()?;
        let submission = reader.token()?;
        let moderation = reader.token()?;
        let flag = reader.byte()?;
        let description = reader.string()?;
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
        if v.get_audience_keys(&stage_hash).await.is_some() {
            return Err(ValidationError::Conflict("stage"));
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v.set_new_audience(stage_hash, self.stage_keys()).await {
            return Err(ValidationError::Conflict("stage"));
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let author = Keypair::from_seed(&[20; 32]);
        let mut create = CreateStage {
            epoch_stamp: 3,
            author: author.public_key(),
            stage: Token::from_bytes([21; 32]),
            submission: Token::from_bytes([22; 32]),
            moderation: Token::ZERO,
            flag: 0b0000_0001,
            description: "open forum".into(),
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        create.sign(&author, Token::ZERO);
        create.pay_fee(5, &author);
        let parsed = CreateStage::parse(&create.serialize()).unwrap();
        assert_eq!(parsed, create);
        assert_eq!(parsed.stage_keys().flag, 1);
    }

    #[test]
    fn flag_byte_carried_verbatim() {
        let author = Keypair::from_seed(&[20; 32]);
        let mut create = CreateStage {
            epoch_stamp: 3,
            author: author.public_key(),
            stage: Token::from_bytes([21; 32]),
            submission: Token::ZERO,
            moderation: Token::ZERO,
            flag: 0xf7,
            description: String::new(),
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        create.sign(&author, Token::ZERO);
        create.pay_fee(0, &author);
        let parsed = CreateStage::parse(&create.serialize()).unwrap();
        assert_eq!(parsed.flag, 0xf7);
    }
}
