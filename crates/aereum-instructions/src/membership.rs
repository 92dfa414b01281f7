//! Membership instructions: joining the network and rewriting the caption.

use aereum_core::{wire, Hash, Keypair, Signature, Token, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::parse::{
    check_attorney, check_signature, check_wallet_signature, fee_payer, read_chain_header,
};
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

/// Registers a new member under a unique human-readable caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinNetwork {
    pub epoch_stamp: u64,
    pub author: Token,
    pub caption: String,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl JoinNetwork {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![crate::CURRENT_VERSION, InstructionKind::JoinNetwork.tag()];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_string(&self.caption, &mut bytes);
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
        let (epoch_stamp, author) = read_chain_header(&mut reader, InstructionKind::JoinNetwork)?;
        let caption = reader.string()?;
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
            caption,
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
        let token_hash = Hash::of_token(&self.author);
        let caption_hash = Hash::of(self.caption.as_bytes());
        if v.has_member(&token_hash).await {
            return Err(ValidationError::Conflict("member"));
        }
        if v.has_caption(&caption_hash).await {
            return Err(ValidationError::Conflict("caption"));
        }
        check_attorney(&*v, &self.author, &self.attorney).await?;
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v.set_new_member(token_hash, caption_hash).await {
            return Err(ValidationError::Conflict("member"));
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}

/// Rebinds a member to a new caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub epoch_stamp: u64,
    pub author: Token,
    pub caption: String,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl UpdateInfo {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![crate::CURRENT_VERSION, InstructionKind::UpdateInfo.tag()];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_string(&self.caption, &mut bytes);
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
        let (epoch_stamp, author) = read_chain_header(&mut reader, InstructionKind::UpdateInfo)?;
        let caption = reader.string()?;
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
            caption,
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
        let caption_hash = Hash::of(self.caption.as_bytes());
        if v.has_caption(&caption_hash).await {
            return Err(ValidationError::Conflict("caption"));
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v.set_new_caption(caption_hash).await {
            return Err(ValidationError::Conflict("caption"));
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}
