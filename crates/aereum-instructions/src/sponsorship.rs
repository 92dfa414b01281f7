//! Sponsorship: a two-phase economic primitive.
//!
//! A member offers to sponsor one future publication on a stage, naming the
//! content and a revenue for the stage owner. Accepting the offer consumes
//! it, settles the revenue, and records a grant keyed by
//! `hash(author || stage)` that authorizes exactly one sponsored Content.

use aereum_core::{wire, Hash, Keypair, Signature, Token, WireReader};
use bytes::Bytes;

use crate::error::{ParseError, ValidationError};
use crate::parse::{
    check_attorney, check_signature, check_wallet_signature, fee_payer, read_chain_header,
};
use crate::payment::Payment;
use crate::validator::InstructionValidator;
use crate::InstructionKind;

/// Offers to pay `revenue` for publishing `content` on `stage`. The offer
/// is addressed by the hash of its own serialization and lapses after
/// `expire`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorshipOffer {
    pub epoch_stamp: u64,
    pub author: Token,
    pub stage: Token,
    pub content_type: String,
    pub content: Bytes,
    pub expire: u64,
    pub revenue: u64,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl SponsorshipOffer {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![
            crate::CURRENT_VERSION,
            InstructionKind::SponsorshipOffer.tag(),
        ];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_token(&self.stage, &mut bytes);
        wire::put_string(&self.content_type, &mut bytes);
        wire::put_bytes(&self.content, &mut bytes);
        wire::put_u64(self.expire, &mut bytes);
        wire::put_u64(self.revenue, &mut bytes);
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

    /// The hash under which the offer is indexed.
    pub fn offer_hash(&self) -> Hash {
        Hash::of(&self.serialize())
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
            read_chain_header(&mut reader, InstructionKind::SponsorshipOffer)?;
        let stage = reader.token()?;
        let content_type = reader.string()?;
        let content = Bytes::from(reader.bytes()?);
        let expire = reader.u64()?;
        let revenue = reader.u64()?;
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
            content_type,
            content,
            expire,
            revenue,
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
        if v.get_audience_keys(&Hash::of_token(&self.stage)).await.is_none() {
            return Err(ValidationError::UnknownPrincipal("stage"));
        }
        if self.expire <= v.epoch() {
            return Err(ValidationError::Expired {
                expire: self.expire,
                current: v.epoch(),
            });
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v.set_new_spn_offer(self.offer_hash(), self.expire).await {
            return Err(ValidationError::Conflict("sponsorship offer"));
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}

/// Accepts a sponsorship offer. Carries the full serialized offer so the
/// acceptance is self-contained; the embedded bytes are re-parsed and every
/// embedded signature re-verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorshipAcceptance {
    pub epoch_stamp: u64,
    pub author: Token,
    pub offer: SponsorshipOffer,
    pub attorney: Token,
    pub signature: Signature,
    pub wallet: Token,
    pub fee: u64,
    pub wallet_signature: Signature,
}

impl SponsorshipAcceptance {
    fn serialize_sign(&self) -> Vec<u8> {
        let mut bytes = vec![
            crate::CURRENT_VERSION,
            InstructionKind::SponsorshipAcceptance.tag(),
        ];
        wire::put_u64(self.epoch_stamp, &mut bytes);
        wire::put_token(&self.author, &mut bytes);
        wire::put_bytes(&self.offer.serialize(), &mut bytes);
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

    /// Fee from the accepting chain, revenue from the sponsor to the
    /// accepting author.
    pub fn payments(&self) -> Payment {
        let mut payment = Payment::new_debit(
            fee_payer(&self.wallet, &self.attorney, &self.author),
            self.fee,
        );
        if self.offer.revenue > 0 {
            payment.debit(Hash::of_token(&self.offer.author), self.offer.revenue);
            payment.credit(Hash::of_token(&self.author), self.offer.revenue);
        }
        payment
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(data);
        let (epoch_stamp, author) =
            read_chain_header(&mut reader, InstructionKind::SponsorshipAcceptance)?;
        let offer_bytes = reader.bytes()?;
        let offer = SponsorshipOffer::parse(&offer_bytes)
            .map_err(|_| ParseError::MalformedEmbedded("sponsorship offer"))?;
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
            offer,
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
        let offer_hash = self.offer.offer_hash();
        let expire = v.sponsorship_offer(&offer_hash).await;
        if expire == 0 {
            return Err(ValidationError::UnknownPrincipal("sponsorship offer"));
        }
        if expire < v.epoch() {
            return Err(ValidationError::Expired {
                expire,
                current: v.epoch(),
            });
        }
        if !v.can_pay(&self.payments()).await {
            return Err(ValidationError::InsufficientFunds);
        }
        if !v.set_new_use_spn_offer(offer_hash).await {
            return Err(ValidationError::Conflict("sponsorship offer"));
        }
        let grant_hash = Hash::of_pair(&self.offer.author, &self.offer.stage);
        if !v
            .set_new_granted_sponsor(grant_hash, Hash::of(&self.offer.content))
            .await
        {
            return Err(ValidationError::Conflict("sponsor grant"));
        }
        v.add_fee_collected(self.fee);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_offer(sponsor: &Keypair) -> SponsorshipOffer {
        let mut offer = SponsorshipOffer {
            epoch_stamp: 4,
            author: sponsor.public_key(),
            stage: Token::from_bytes([81; 32]),
            content_type: "text/plain".into(),
            content: Bytes::from_static(b"a word from our sponsor"),
            expire: 20,
            revenue: 300,
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        offer.sign(sponsor, Token::ZERO);
        offer.pay_fee(2, sponsor);
        offer
    }

    #[test]
    fn offer_roundtrip() {
        let sponsor = Keypair::from_seed(&[80; 32]);
        let offer = signed_offer(&sponsor);
        let parsed = SponsorshipOffer::parse(&offer.serialize()).unwrap();
        assert_eq!(parsed, offer);
        assert_eq!(parsed.offer_hash(), offer.offer_hash());
    }

    #[test]
    fn acceptance_roundtrip_embeds_offer() {
        let sponsor = Keypair::from_seed(&[80; 32]);
        let owner = Keypair::from_seed(&[82; 32]);
        let mut acceptance = SponsorshipAcceptance {
            epoch_stamp: 5,
            author: owner.public_key(),
            offer: signed_offer(&sponsor),
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        acceptance.sign(&owner, Token::ZERO);
        acceptance.pay_fee(1, &owner);
        let parsed = SponsorshipAcceptance::parse(&acceptance.serialize()).unwrap();
        assert_eq!(parsed, acceptance);
    }

    #[test]
    fn acceptance_moves_revenue_from_sponsor_to_owner() {
        let sponsor = Keypair::from_seed(&[80; 32]);
        let owner = Keypair::from_seed(&[82; 32]);
        let mut acceptance = SponsorshipAcceptance {
            epoch_stamp: 5,
            author: owner.public_key(),
            offer: signed_offer(&sponsor),
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        acceptance.sign(&owner, Token::ZERO);
        acceptance.pay_fee(1, &owner);
        let payment = acceptance.payments();
        assert_eq!(
            payment.credited_to(&Hash::of_token(&owner.public_key())),
            300
        );
        assert!(payment
            .debits
            .iter()
            .any(|e| e.account == Hash::of_token(&sponsor.public_key()) && e.value == 300));
    }

    #[test]
    fn tampered_embedded_offer_is_rejected() {
        let sponsor = Keypair::from_seed(&[80; 32]);
        let owner = Keypair::from_seed(&[82; 32]);
        let mut acceptance = SponsorshipAcceptance {
            epoch_stamp: 5,
            author: owner.public_key(),
            offer: signed_offer(&sponsor),
            attorney: Token::ZERO,
            signature: Signature::ZERO,
            wallet: Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        acceptance.sign(&owner, Token::ZERO);
        acceptance.pay_fee(1, &owner);
        let mut bytes = acceptance.serialize();
        // flip a bit inside the embedded offer's revenue field
        bytes[60] ^= 0x01;
        assert!(SponsorshipAcceptance::parse(&bytes).is_err());
    }
}
