//! AcceptJoinRequest: a moderator admits a member into a stage.
//!
//! Carries the member's stage keys encrypted to them (read, submit and
//! moderate payloads). The moderation signature covers the bulk up to those
//! payloads and must verify with the stage's moderation key.

use aereum_core::{wire, Hash, Keypair, Signature, Token, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::parse::{
    check_attorney, check_signature, check_wallet_signature, fee_payer, read_chain_header,
};
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptJoinRequest {
    pub epoch_stamp: u64,
    pub author: Token,
    pub stage: Token,
    pub member: Token,
    pub diffie_hellman_key: Token,
    pub read: Vec<u8>,
    pub submit: Vec<u8>,
    pub moderate: Vec<u8>,
    pub mod_signature: Signature,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl AcceptJoinRequest {
    fn serialize_mod_sign(&self) -> Vec<u8> {
        let mut bytes = vec![
            crate::CURRENT_VERSION,
            InstructionKind::AcceptJoinRequest.tag(),
        ];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_token(&self.stage, &mut bytes);
        wire::put_token(&self.member, &mut bytes);
        wire::put_token(&self.diffie_hellman_key, &mut bytes);
        wire::put_bytes(&self.read, &mut bytes);
        wire::put_bytes(&self.submit, &mut bytes);
        wire::put_bytes(&self.moderate, &mut bytes);
        bytes
    }

    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = self.serialize_mod_sign();
        wire::put_signature(&self.mod_signature, &mut bytes);
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

    /// Sign the moderation bulk with the stage's moderation key.
    pub fn moderate_sign(&mut self, key: &Keypair) {
        self.mod_signature = key.sign(&self.serialize_mod_sign());
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

    pub fn payments(&self) -> Payment {
        Payment::new_debit(
            fee_payer(&self.wallet, &self.attorney, &self.author),
            self.fee,
        )
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(data);
        let (epoch_stamp, author) =
            read_chain_header(&mut reader, InstructionKind::AcceptJoinRequest)?;
        let stage = reader.token()?;
        let member = reader.token()?;
        let diffie_hellman_key = reader.token()?;
        let read = reader.bytes()?;
        let submit = reader.bytes()?;
        let moderate = reader.bytes()?;
        let mod_signature = reader.signature()?;
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
            member,
            diffie_hellman_key,
            read,
            submit,
            moderate,
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
        let keys = v
            .get_audience_keys(&Hash::of_token(&self.stage))
            .await
            .ok_or(ValidationError::UnknownPrincipal("stage"))?;
        if keys.moderate.is_zero() {
            return Err(ValidationError::UnknownPrincipal("moderation key"));
        }
        if !keys
            .moderate
            .verify(&self.serialize_mod_sign(), &self.mod_signature)
        {
            return Err(ValidationError::BadSignature("moderation"));
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
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
        let moderator = Keypair::from_seed(&[40; 32]);
        let mod_key = Keypair::from_seed(&[41; 32]);
        let mut accept = AcceptJoinRequest {
            epoch_stamp: 5,
            author: moderator.public_key(),
            stage: Token::from_bytes([42; 32]),
            member: Token::from_bytes([43; 32]),
            diffie_hellman_key: Token::from_bytes([44; 32]),
            read: vec![1, 2, 3],
            submit: vec![4, 5],
            moderate: Vec::new(),
            mod_signature: Signature::ZERO,
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        accept.moderate_sign(&mod_key);
        accept.sign(&moderator, Token::ZERO);
        accept.pay_fee(1, &moderator);
        let parsed = AcceptJoinRequest::parse(&accept.serialize()).unwrap();
        assert_eq!(parsed, accept);
        // the moderation bulk is what the stage's moderation key signed
        assert!(mod_key
            .public_key()
            .verify(&parsed.serialize_mod_sign(), &parsed.mod_signature));
    }
}
