//! # Aereum Instructions
//!
//! The instruction codec and validation pipeline: a closed set of 17
//! instruction kinds over a versioned, byte-exact binary format with
//! layered signatures.
//!
//! Parsing checks structure and every embedded signature in the order it
//! was produced; no partial instruction escapes a failed parse. Validation
//! runs against the [`InstructionValidator`] capability surface, which the
//! state layer implements over committed state plus the pending block
//! overlay.

pub mod accept_join;
pub mod content;
pub mod create_stage;
pub mod deposit;
pub mod ephemeral;
pub mod error;
pub mod join_stage;
pub mod membership;
mod parse;
pub mod payment;
pub mod power_of_attorney;
pub mod react;
pub mod sponsorship;
pub mod transfer;
pub mod update_stage;
pub mod validator;
pub mod withdraw;

pub use accept_join::AcceptJoinRequest;
pub use content::Content;
pub use create_stage::CreateStage;
pub use deposit::Deposit;
pub use ephemeral::{CreateEphemeral, SecureChannel};
pub use error::{ParseError, ValidationError};
pub use join_stage::JoinStage;
pub use membership::{JoinNetwork, UpdateInfo};
pub use payment::{Payment, PaymentEntry};
pub use power_of_attorney::{GrantPowerOfAttorney, RevokePowerOfAttorney};
pub use react::React;
pub use sponsorship::{SponsorshipAcceptance, SponsorshipOffer};
pub use transfer::{TokenValue, Transfer};
pub use update_stage::UpdateStage;
pub use validator::InstructionValidator;
pub use withdraw::Withdraw;

use aereum_core::{Hash, Token};

/// The protocol version every serialized instruction opens with.
pub const CURRENT_VERSION: u8 = 0;

/// The instruction kind tag, byte 1 of the wire header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum InstructionKind {
    Transfer = 0,
    Deposit = 1,
    Withdraw = 2,
    JoinNetwork = 3,
    UpdateInfo = 4,
    CreateStage = 5,
    JoinStage = 6,
    AcceptJoinRequest = 7,
    Content = 8,
    UpdateStage = 9,
    GrantPowerOfAttorney = 10,
    RevokePowerOfAttorney = 11,
    SponsorshipOffer = 12,
    SponsorshipAcceptance = 13,
    CreateEphemeral = 14,
    SecureChannel = 15,
    React = 16,
}

impl InstructionKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Transfer),
            1 => Some(Self::Deposit),
            2 => Some(Self::Withdraw),
            3 => Some(Self::JoinNetwork),
            4 => Some(Self::UpdateInfo),
            5 => Some(Self::CreateStage),
            6 => Some(Self::JoinStage),
            7 => Some(Self::AcceptJoinRequest),
            8 => Some(Self::Content),
            9 => Some(Self::UpdateStage),
            10 => Some(Self::GrantPowerOfAttorney),
            11 => Some(Self::RevokePowerOfAttorney),
            12 => Some(Self::SponsorshipOffer),
            13 => Some(Self::SponsorshipAcceptance),
            14 => Some(Self::CreateEphemeral),
            15 => Some(Self::SecureChannel),
            16 => Some(Self::React),
            _ => None,
        }
    }
}

/// A parsed instruction of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Transfer(Transfer),
    Deposit(Deposit),
    Withdraw(Withdraw),
    JoinNetwork(JoinNetwork),
    UpdateInfo(UpdateInfo),
    CreateStage(CreateStage),
    JoinStage(JoinStage),
    AcceptJoinRequest(AcceptJoinRequest),
    Content(Content),
    UpdateStage(UpdateStage),
    GrantPowerOfAttorney(GrantPowerOfAttorney),
    RevokePowerOfAttorney(RevokePowerOfAttorney),
    SponsorshipOffer(SponsorshipOffer),
    SponsorshipAcceptance(SponsorshipAcceptance),
    CreateEphemeral(CreateEphemeral),
    SecureChannel(SecureChannel),
    React(React),
}

impl Instruction {
    /// Parse a byte string into an instruction.
    ///
    /// Structure and every embedded signature are checked here; state-
    /// dependent checks are left to [`Instruction::validate`].
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < 2 {
            return Err(ParseError::MissingHeader);
        }
        if data[0] != CURRENT_VERSION {
            return Err(ParseError::BadVersion(data[0]));
        }
        let kind = InstructionKind::from_tag(data[1]).ok_or(ParseError::UnknownKind(data[1]))?;
        Ok(match kind {
            InstructionKind::Transfer => Self::Transfer(Transfer::parse(data)?),
            InstructionKind::Deposit => Self::Deposit(Deposit::parse(data)?),
            InstructionKind::Withdraw => Self::Withdraw(Withdraw::parse(data)?),
            InstructionKind::JoinNetwork => Self::JoinNetwork(JoinNetwork::parse(data)?),
            InstructionKind::UpdateInfo => Self::UpdateInfo(UpdateInfo::parse(data)?),
            InstructionKind::CreateStage => Self::CreateStage(CreateStage::parse(data)?),
            InstructionKind::JoinStage => Self::JoinStage(JoinStage::parse(data)?),
            InstructionKind::AcceptJoinRequest => {
                Self::AcceptJoinRequest(AcceptJoinRequest::parse(data)?)
            }
            InstructionKind::Content => Self::Content(Content::parse(data)?),
            InstructionKind::UpdateStage => Self::UpdateStage(UpdateStage::parse(data)?),
            InstructionKind::GrantPowerOfAttorney => {
                Self::GrantPowerOfAttorney(GrantPowerOfAttorney::parse(data)?)
            }
            InstructionKind::RevokePowerOfAttorney => {
                Self::RevokePowerOfAttorney(RevokePowerOfAttorney::parse(data)?)
            }
            InstructionKind::SponsorshipOffer => {
                Self::SponsorshipOffer(SponsorshipOffer::parse(data)?)
            }
            InstructionKind::SponsorshipAcceptance => {
                Self::SponsorshipAcceptance(SponsorshipAcceptance::parse(data)?)
            }
            InstructionKind::CreateEphemeral => {
                Self::CreateEphemeral(CreateEphemeral::parse(data)?)
            }
            InstructionKind::SecureChannel => Self::SecureChannel(SecureChannel::parse(data)?),
            InstructionKind::React => Self::React(React::parse(data)?),
        })
    }

    pub fn kind(&self) -> InstructionKind {
        match self {
            Self::Transfer(_) => InstructionKind::Transfer,
            Self::Deposit(_) => InstructionKind::Deposit,
            Self::Withdraw(_) => InstructionKind::Withdraw,
            Self::JoinNetwork(_) => InstructionKind::JoinNetwork,
            Self::UpdateInfo(_) => InstructionKind::UpdateInfo,
            Self::CreateStage(_) => InstructionKind::CreateStage,
            Self::JoinStage(_) => InstructionKind::JoinStage,
            Self::AcceptJoinRequest(_) => InstructionKind::AcceptJoinRequest,
            Self::Content(_) => InstructionKind::Content,
            Self::UpdateStage(_) => InstructionKind::UpdateStage,
            Self::GrantPowerOfAttorney(_) => InstructionKind::GrantPowerOfAttorney,
            Self::RevokePowerOfAttorney(_) => InstructionKind::RevokePowerOfAttorney,
            Self::SponsorshipOffer(_) => InstructionKind::SponsorshipOffer,
            Self::SponsorshipAcceptance(_) => InstructionKind::SponsorshipAcceptance,
            Self::CreateEphemeral(_) => InstructionKind::CreateEphemeral,
            Self::SecureChannel(_) => InstructionKind::SecureChannel,
            Self::React(_) => InstructionKind::React,
        }
    }

    pub fn epoch(&self) -> u64 {
        match self {
            Self::Transfer(i) => i.epoch_stamp,
            Self::Deposit(i) => i.epoch_stamp,
            Self::Withdraw(i) => i.epoch_stamp,
            Self::JoinNetwork(i) => i.epoch_stamp,
            Self::UpdateInfo(i) => i.epoch_stamp,
            Self::CreateStage(i) => i.epoch_stamp,
            Self::JoinStage(i) => i.epoch_stamp,
            Self::AcceptJoinRequest(i) => i.epoch_stamp,
            Self::Content(i) => i.epoch_stamp,
            Self::UpdateStage(i) => i.epoch_stamp,
            Self::GrantPowerOfAttorney(i) => i.epoch_stamp,
            Self::RevokePowerOfAttorney(i) => i.epoch_stamp,
            Self::SponsorshipOffer(i) => i.epoch_stamp,
            Self::SponsorshipAcceptance(i) => i.epoch_stamp,
            Self::CreateEphemeral(i) => i.epoch_stamp,
            Self::SecureChannel(i) => i.epoch_stamp,
            Self::React(i) => i.epoch_stamp,
        }
    }

    /// The principal a relay should hold responsible for the instruction.
    pub fn authority(&self) -> Token {
        match self {
            Self::Transfer(_) | Self::Deposit(_) | Self::Withdraw(_) => Token::ZERO,
            Self::JoinNetwork(i) => i.author,
            Self::UpdateInfo(i) => i.author,
            Self::CreateStage(i) => i.author,
            Self::JoinStage(i) => i.author,
            Self::AcceptJoinRequest(i) => i.author,
            Self::Content(i) => {
                if !i.moderator.is_zero() {
                    i.moderator
                } else {
                    i.author
                }
            }
            Self::UpdateStage(i) => i.author,
            Self::GrantPowerOfAttorney(i) => i.author,
            Self::RevokePowerOfAttorney(i) => i.author,
            Self::SponsorshipOffer(i) => i.author,
            Self::SponsorshipAcceptance(i) => i.author,
            Self::CreateEphemeral(i) => i.author,
            Self::SecureChannel(i) => i.author,
            Self::React(i) => i.author,
        }
    }

    pub fn payments(&self) -> Payment {
        match self {
            Self::Transfer(i) => i.payments(),
            Self::Deposit(i) => i.payments(),
            Self::Withdraw(i) => i.payments(),
            Self::JoinNetwork(i) => i.payments(),
            Self::UpdateInfo(i) => i.payments(),
            Self::CreateStage(i) => i.payments(),
            Self::JoinStage(i) => i.payments(),
            Self::AcceptJoinRequest(i) => i.payments(),
            Self::Content(i) => i.payments(),
            Self::UpdateStage(i) => i.payments(),
            Self::GrantPowerOfAttorney(i) => i.payments(),
            Self::RevokePowerOfAttorney(i) => i.payments(),
            Self::SponsorshipOffer(i) => i.payments(),
            Self::SponsorshipAcceptance(i) => i.payments(),
            Self::CreateEphemeral(i) => i.payments(),
            Self::SecureChannel(i) => i.payments(),
            Self::React(i) => i.payments(),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Self::Transfer(i) => i.serialize(),
            Self::Deposit(i) => i.serialize(),
            Self::Withdraw(i) => i.serialize(),
            Self::JoinNetwork(i) => i.serialize(),
            Self::UpdateInfo(i) => i.serialize(),
            Self::CreateStage(i) => i.serialize(),
            Self::JoinStage(i) => i.serialize(),
            Self::AcceptJoinRequest(i) => i.serialize(),
            Self::Content(i) => i.serialize(),
            Self::UpdateStage(i) => i.serialize(),
            Self::GrantPowerOfAttorney(i) => i.serialize(),
            Self::RevokePowerOfAttorney(i) => i.serialize(),
            Self::SponsorshipOffer(i) => i.serialize(),
            Self::SponsorshipAcceptance(i) => i.serialize(),
            Self::CreateEphemeral(i) => i.serialize(),
            Self::SecureChannel(i) => i.serialize(),
            Self::React(i) => i.serialize(),
        }
    }

    /// Hash of the canonical serialization.
    pub fn canonical_hash(&self) -> Hash {
        Hash::of(&self.serialize())
    }

    /// Validate against ledger state. On success every kind records its
    /// fee; state-mutating kinds additionally write their effects to the
    /// overlay behind `v`.
    pub async fn validate(
        &self,
        v: &mut (dyn InstructionValidator + '_),
    ) -> Result<(), ValidationError> {
        let current = v.epoch();
        if self.epoch() > current {
            return Err(ValidationError::FutureEpoch {
                stamp: self.epoch(),
                current,
            });
        }
        match self {
            Self::Transfer(i) => i.validate(v).await,
            Self::Deposit(i) => i.validate(v).await,
            Self::Withdraw(i) => i.validate(v).await,
            Self::JoinNetwork(i) => i.validate(v).await,
            Self::UpdateInfo(i) => i.validate(v).await,
            Self::CreateStage(i) => i.validate(v).await,
            Self::JoinStage(i) => i.validate(v).await,
            Self::AcceptJoinRequest(i) => i.validate(v).await,
            Self::Content(i) => i.validate(v).await,
            Self::UpdateStage(i) => i.validate(v).await,
            Self::GrantPowerOfAttorney(i) => i.validate(v).await,
            Self::RevokePowerOfAttorney(i) => i.validate(v).await,
            Self::SponsorshipOffer(i) => i.validate(v).await,
            Self::SponsorshipAcceptance(i) => i.validate(v).await,
            Self::CreateEphemeral(i) => i.validate(v).await,
            Self::SecureChannel(i) => i.validate(v).await,
            Self::React(i) => i.validate(v).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aereum_core::{Keypair, Signature};
    use proptest::prelude::*;

    #[test]
    fn kind_tags_roundtrip() {
        for tag in 0..=16u8 {
            let kind = InstructionKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(InstructionKind::from_tag(17), None);
    }

    #[test]
    fn bad_version_is_rejected() {
        assert_eq!(Instruction::parse(&[1, 0]), Err(ParseError::BadVersion(1)));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(Instruction::parse(&[0, 99]), Err(ParseError::UnknownKind(99)));
    }

    #[test]
    fn dispatch_recovers_the_kind() {
        let author = Keypair::from_seed(&[1; 32]);
        let mut react = React {
            epoch_stamp: 1,
            author: author.public_key(),
            hash: vec![1],
            reaction: 1,
            attorney: aereum_core::Token::ZERO,
            signature: Signature::ZERO,
            wallet: aereum_core::Token::ZERO,
            fee: 0,
            wallet_signature: Signature::ZERO,
        };
        react.sign(&author, aereum_core::Token::ZERO);
        react.pay_fee(0, &author);
        let parsed = Instruction::parse(&react.serialize()).unwrap();
        assert_eq!(parsed.kind(), InstructionKind::React);
        assert_eq!(parsed.serialize(), react.serialize());
    }

    proptest! {
        #[test]
        fn transfer_roundtrips_for_arbitrary_fields(
            seed in any::<[u8; 32]>(),
            epoch in any::<u64>(),
            values in proptest::collection::vec((any::<[u8; 32]>(), any::<u64>()), 0..8),
            reason in ".{0,64}",
            fee in any::<u64>(),
        ) {
            let from = Keypair::from_seed(&seed);
            let mut transfer = Transfer {
                epoch_stamp: epoch,
                from: from.public_key(),
                to: values
                    .iter()
                    .map(|(t, v)| TokenValue { token: aereum_core::Token::from_bytes(*t), value: *v })
                    .collect(),
                reason,
                fee,
                signature: Signature::ZERO,
            };
            transfer.sign(&from);
            let bytes = transfer.serialize();
            let parsed = Instruction::parse(&bytes).unwrap();
            prop_assert_eq!(parsed.serialize(), bytes);
        }

        #[test]
        fn transfer_rejects_any_flip_in_signed_region(
            seed in any::<[u8; 32]>(),
            flip_bit in 0usize..8,
        ) {
            let from = Keypair::from_seed(&seed);
            let mut transfer = Transfer {
                epoch_stamp: 3,
                from: from.public_key(),
                to: vec![TokenValue { token: aereum_core::Token::from_bytes([9; 32]), value: 10 }],
                reason: "r".into(),
                fee: 1,
                signature: Signature::ZERO,
            };
            transfer.sign(&from);
            let mut bytes = transfer.serialize();
            let signed_len = bytes.len() - 64;
            // flip one bit somewhere in the signed region, past the header
            let index = 2 + (flip_bit * 7) % (signed_len - 2);
            bytes[index] ^= 1 << (flip_bit % 8);
            prop_assert!(Instruction::parse(&bytes).is_err());
        }
    }
}
