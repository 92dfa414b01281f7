//! React: a one-byte reaction to some published content.

use aereum_core::{wire, Hash, Keypair, Signature, Token, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::parse::{
    check_attorney, check_signature, check_wallet_signature, fee_payer, read_chain_header,
};
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct React {
    pub epoch_stamp: u64,
    pub author: Token,
    /// Hash of the content being reacted to.
    pub hash: Vec<u8>,
    pub reaction: u8,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl React {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![crate::CURRENT_VERSION, InstructionKind::React.tag()];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_bytes(&self.hash, &mut bytes);
        wire::put_byte(self.reaction, &mut bytes);
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

    pub fn payments(&self) -> Payment {
        Payment::new_debit(
            fee_payer(&self.wallet, &self.attorney, &self.author),
            self.fee,
        )
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(data);
        let (epoch_stamp, author) = read_chain_header(&mut reader, InstructionKind::React)?;
        let hash = reader.bytes()?;
        let reaction = reader.byte()?;
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
            hash,
            reaction,
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
    fn roundtrip_author_pays() {
        let author = Keypair::generate();
        let mut react = React {
            epoch_stamp: 317_467_328_642,
            author: author.public_key(),
            hash: vec![1, 2, 3, 4, 5, 8],
            reaction: 10,
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        react.sign(&author, Token::ZERO);
        react.pay_fee(7_836_548_723_687_436, &author);
        assert!(react.wallet.is_zero());

        let parsed = React::parse(&react.serialize()).unwrap();
        assert_eq!(parsed, react);
    }

    #[test]
    fn roundtrip_attorney_signs_and_pays() {
        let author = Keypair::generate();
        let attorney = Keypair::generate();
        let mut react = React {
            epoch_stamp: 317_467_328_642,
            author: author.public_key(),
            hash: vec![1, 2, 3, 4, 5, 8],
            reaction: 10,
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        react.sign(&attorney, attorney.public_key());
        react.pay_fee(7_836_548_723_687_436, &attorney);
        assert!(react.wallet.is_zero());

        let parsed = React::parse(&react.serialize()).unwrap();
        assert_eq!(parsed, react);
        assert_eq!(
            parsed.payments().debits[0].account,
            Hash::of_token(&attorney.public_key())
        );
    }
}
