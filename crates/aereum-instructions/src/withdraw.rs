//! Withdraw: release collateral back to the wallet book.

use aereum_core::{wire, Hash, Keypair, Signature, Token, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::parse::read_header;
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdraw {
    pub epoch_stamp: u64,
    pub token: Token,
    pub value: u64,
    pub fee: u64,
    pub signature: Signature,
}

impl Withdraw {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![crate::CURRENT_VERSION, InstructionKind::Withdraw.tag()];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.token, &mut bytes);
        wire::put_u64(self.value, &mut bytes);
        wire::put_u64(self.fee, &mut bytes);
        bytes
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = self.serialize_sign();
        wire::put_signature(&self.signature, &mut bytes);
        bytes
    }

    pub fn sign(&mut self, key: &Keypair) {
        self.signature = key.sign(&self.serialize_sign());
    }

    pub fn payments(&self) -> Payment {
        Payment::new_debit(Hash::of_token(&self.token), self.fee)
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(data);
        let epoch_stamp = read_header(&mut reader, InstructionKind::Withdraw)?;
        let token = reader.token()?;
        let value = reader.u64()?;
        let fee = reader.u64()?;
        let message = reader.prefix();
        let signature = reader.signature()?;
        if !token.verify(message, &signature) {
            return Err(ParseError::BadSignature("withdraw"));
        }
        reader.finish()?;
        Ok(Self {
            epoch_stamp,
            token,
            value,
            fee,
            signature,
        })
    }

    pub(crate) async fn validate(
        &self,
        v: &mut (dyn InstructionValidator + '_),
    ) -> Result<(), ValidationError> {
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v.can_withdraw(Hash::of_token(&self.token), self.value).await {
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
        let key = Keypair::from_seed(&[6; 32]);
        let mut withdraw = Withdraw {
            epoch_stamp: 9,
            token: key.public_key(),
            value: 77,
            fee: 1,
            signature: Signature::ZERO,
        };
        withdraw.sign(&key);
        let parsed = Withdraw::parse(&withdraw.serialize()).unwrap();
        assert_eq!(parsed, withdraw);
    }

    #[test]
    fn tampered_value_is_rejected() {
        let key = Keypair::from_seed(&[6; 32]);
        let mut withdraw = Withdraw {
            epoch_stamp: 9,
            token: key.public_key(),
            value: 77,
            fee: 1,
            signature: Signature::ZERO,
        };
        withdraw.sign(&key);
        let mut bytes = withdraw.serialize();
        bytes[42] ^= 0x80;
        assert!(Withdraw::parse(&bytes).is_err());
    }
}
