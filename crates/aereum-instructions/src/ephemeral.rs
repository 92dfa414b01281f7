//! Ephemeral tokens and secure-channel records.
//!
//! An ephemeral token is a short-lived token published with an expiry epoch
//! so peers can bootstrap Diffie–Hellman channels through the ledger. The
//! exchange itself happens at the edge; SecureChannel merely records the
//! handshake bytes against a live ephemeral token.

use aereum_core::{wire, Hash, Keypair, Signature, Token, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::parse::{
    check_attorney, check_signature, check_wallet_signature, fee_payer, read_chain_header,
};
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEphemeral {
    pub epoch_stamp: u64,
    pub author: Token,
    pub ephemeral_token: Token,
    pub expire: u64,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl CreateEphemeral {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![
            crate::CURRENT_VERSION,
            InstructionKind::CreateEphemeral.tag(),
        ];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_token(&self.ephemeral_token, &mut bytes);
        wire::put_u64(self.expire, &mut bytes);
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
        let (epoch_stamp, author) =
            read_chain_header(&mut reader, InstructionKind::CreateEphemeral)?;
        let ephemeral_token = reader.token()?;
        let expire = reader.u64()?;
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
            ephemeral_token,
            expire,
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
        if self.expire <= v.epoch() {
            return Err(ValidationError::Expired {
                expire: self.expire,
                current: v.epoch(),
            });
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v
            .set_new_ephemeral_token(Hash::of_token(&self.ephemeral_token), self.expire)
            .await
        {
            return Err(ValidationError::Conflict("ephemeral token"));
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}

/// Records a Diffie–Hellman exchange against a live ephemeral token. No
/// state mutation beyond the fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureChannel {
    pub epoch_stamp: u64,
    pub author: Token,
    pub ephemeral_token: Token,
    pub diffie_hellman_key: Token,
    pub content: Vec<u8>,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl SecureChannel {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![crate::CURRENT_VERSION, InstructionKind::SecureChannel.tag()];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_token(&self.ephemeral_token, &mut bytes);
        wire::put_token(&self.diffie_hellman_key, &mut bytes);
        wire::put_bytes(&self.content, &mut bytes);
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
        let (epoch_stamp, author) = read_chain_header(&mut reader, InstructionKind::SecureChannel)?;
        let ephemeral_token = reader.token()?;
        let diffie_hellman_key = reader.token()?;
        let content = reader.bytes()?;
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
            ephemeral_token,
            diffie_hellman_key,
            content,
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
        check_attorney(&*v, &self.author, &self.attorney).await?;
        let ephemeral_hash = Hash::of_token(&self.ephemeral_token);
        let expire = v
            .get_ephemeral_expire(&ephemeral_hash)
            .await
            .ok_or(ValidationError::UnknownPrincipal("ephemeral token"))?;
        if expire < v.epoch() {
            return Err(ValidationError::Expired {
                expire,
                current: v.epoch(),
            });
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}
