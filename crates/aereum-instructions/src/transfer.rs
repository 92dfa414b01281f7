//! Transfer: move fungible tokens between wallets.

use aereum_core::{wire, Hash, Keypair, Signature, Token, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::parse::read_header;
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

/// One recipient of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenValue {
    pub token: Token,
    pub value: u64,
}

/// Moves tokens from one wallet to any number of recipients. Debits equal
/// credits plus the fee, so the total supply is conserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub epoch_stamp: u64,
    pub from: Token,
    pub to: Vec<TokenValue>,
    pub reason: String,
    pub fee: u64,
    pub signature: Signature,
}

impl Transfer {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![crate::CURRENT_VERSION, InstructionKind::Transfer.tag()];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.from, &mut bytes);
        wire::put_u16(self.to.len() as u16, &mut bytes);
        for entry in self.to.iter().take(u16::MAX as usize) {
            wire::put_token(&entry.token, &mut bytes);
            wire::put_u64(entry.value, &mut bytes);
        }
        wire::put_string(&self.reason, &mut bytes);
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
        let mut payment = Payment::new();
        let mut total = self.fee;
        for entry in &self.to {
            payment.credit(Hash::of_token(&entry.token), entry.value);
            total = total.saturating_add(entry.value);
        }
        payment.debit(Hash::of_token(&self.from), total);
        payment
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(data);
        let epoch_stamp = read_header(&mut reader, InstructionKind::Transfer)?;
        let from = reader.token()?;
        let count = reader.u16()?;
        let mut to = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let token = reader.token()?;
            let value = reader.u64()?;
            to.push(TokenValue { token, value });
        }
        let reason = reader.string()?;
        let fee = reader.u64()?;
        let message = reader.prefix();
        let signature = reader.signature()?;
        if !from.verify(message, &signature) {
            return Err(ParseError::BadSignature("transfer"));
        }
        reader.finish()?;
        Ok(Self {
            epoch_stamp,
            from,
            to,
            reason,
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
        v.add_fee_collected(self.fee);
        Ok(())
    }
}
