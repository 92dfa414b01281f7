//! Delegated signing authority: granting and revoking power of attorney.
//!
//! Both instructions are signed by the author directly; a delegation change
//! cannot itself be delegated. The index key is `hash(author || attorney)`.

use aereum_core::{wire, Hash, Keypair, Signature, Token, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::parse::read_chain_header;
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantPowerOfAttorney {
    pub epoch_stamp: u64,
    pub author: Token,
    /// The token being empowered to sign on the author's behalf.
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl GrantPowerOfAttorney {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![
            crate::CURRENT_VERSION,
            InstructionKind::GrantPowerOfAttorney.tag(),
        ];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
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

    pub fn sign(&mut self, key: &Keypair) {
        self.signature = key.sign(&self.serialize_sign());
    }

    pub fn pay_fee(&mut self, fee: u64, wallet: &Keypair) {
        let token = wallet.public_key();
        self.wallet = if token == self.author { Token::ZERO } else { token };
        self.fee = fee;
        self.wallet_signature = wallet.sign(&self.serialize_wallet_sign());
    }

    pub fn payments(&self) -> Payment {
        let payer = if self.wallet.is_zero() {
            Hash::of_token(&self.author)
        } else {
            Hash::of_token(&self.wallet)
        };
        Payment::new_debit(payer, self.fee)
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(data);
        let (epoch_stamp, author) =
            read_chain_header(&mut reader, InstructionKind::GrantPowerOfAttorney)?;
        let attorney = reader.token()?;
        let message = reader.prefix();
        let signature = reader.signature()?;
        if !author.verify(message, &signature) {
            return Err(ParseError::BadSignature("author"));
        }
        let wallet = reader.token()?;
        let fee = reader.u64()?;
        let message = reader.prefix();
        let wallet_signature = reader.signature()?;
        let wallet_principal = if wallet.is_zero() { author } else { wallet };
        if !wallet_principal.verify(message, &wallet_signature) {
            return Err(ParseError::BadSignature("wallet"));
        }
        reader.finish()?;
        Ok(Self {
            epoch_stamp,
            author,
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
        let pair_hash = Hash::of_pair(&self.author, &self.attorney);
        if v.power_of_attorney(&pair_hash).await {
            return Err(ValidationError::Conflict("power of attorney"));
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v.set_new_grant_power(pair_hash).await {
            return Err(ValidationError::Conflict("power of attorney"));
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokePowerOfAttorney {
    pub epoch_stamp: u64,
    pub author: Token,
    /// The delegation being revoked.
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl RevokePowerOfAttorney {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![
            crate::CURRENT_VERSION,
            InstructionKind::RevokePowerOfAttorney.tag(),
        ];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
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

    pub fn sign(&mut self, key: &Keypair) {
        self.signature = key.sign(&self.serialize_sign());
    }

    pub fn pay_fee(&mut self, fee: u64, wallet: &Keypair) {
        let token = wallet.public_key();
        self.wallet = if token == self.author { Token::ZERO } else { token };
        self.fee = fee;
        self.wallet_signature = wallet.sign(&self.serialize_wallet_sign());
    }

    pub fn payments(&self) -> Payment {
        let payer = if self.wallet.is_zero() {
            Hash::of_token(&self.author)
        } else {
            Hash::of_token(&self.wallet)
        };
        Payment::new_debit(payer, self.fee)
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(data);
        let (epoch_stamp, author) =
            read_chain_header(&mut reader, InstructionKind::RevokePowerOfAttorney)?;
        let attorney = reader.token()?;
        let message = reader.prefix();
        let signature = reader.signature()?;
        if !author.verify(message, &signature) {
            return Err(ParseError::BadSignature("author"));
        }
        let wallet = reader.token()?;
        let fee = reader.u64()?;
        let message = reader.prefix();
        let wallet_signature = reader.signature()?;
        let wallet_principal = if wallet.is_zero() { author } else { wallet };
        if !wallet_principal.verify(message, &wallet_signature) {
            return Err(ParseError::BadSignature("wallet"));
        }
        reader.finish()?;
        Ok(Self {
            epoch_stamp,
            author,
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
        let pair_hash = Hash::of_pair(&self.author, &self.attorney);
        if !v.power_of_attorney(&pair_hash).await {
            return Err(ValidationError::UnknownPrincipal("power of attorney"));
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v.set_new_revoke_power(pair_hash).await {
            return Err(ValidationError::UnknownPrincipal("power of attorney"));
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}
