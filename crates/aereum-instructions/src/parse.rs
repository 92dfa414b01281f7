//! Shared parsing and signature-chain helpers.

use aereum_core::{Hash, Signature, Token, WireReader};

use crate::error::{ParseError, ValidationError};
use crate::validator::InstructionValidator;
use crate::InstructionKind;

/// Read and check the `[version, kind]` header plus the epoch stamp.
pub(crate) fn read_header(
    reader: &mut WireReader<'_>,
    kind: InstructionKind,
) -> Result<u64, ParseError> {
    let version = reader.byte().map_err(|_| ParseError::MissingHeader)?;
    if version != crate::CURRENT_VERSION {
        return Err(ParseError::BadVersion(version));
    }
    let tag = reader.byte().map_err(|_| ParseError::MissingHeader)?;
    if tag != kind.tag() {
        return Err(ParseError::UnknownKind(tag));
    }
    Ok(reader.u64()?)
}

/// Header plus the author token, the common prefix of every chained kind.
pub(crate) fn read_chain_header(
    reader: &mut WireReader<'_>,
    kind: InstructionKind,
) -> Result<(u64, Token), ParseError> {
    let epoch = read_header(reader, kind)?;
    let author = reader.token()?;
    Ok((epoch, author))
}

/// The author-signature principal: attorney when delegated, else author.
pub(crate) fn check_signature(
    message: &[u8],
    signature: &Signature,
    attorney: &Token,
    author: &Token,
) -> bool {
    if !attorney.is_zero() {
        return attorney.verify(message, signature);
    }
    author.verify(message, signature)
}

/// The wallet-signature principal: wallet when present, else whoever signed
/// the author signature.
pub(crate) fn check_wallet_signature(
    message: &[u8],
    signature: &Signature,
    wallet: &Token,
    attorney: &Token,
    author: &Token,
) -> bool {
    if !wallet.is_zero() {
        return wallet.verify(message, signature);
    }
    check_signature(message, signature, attorney, author)
}

/// Hash of the account that pays the fee for a chained instruction.
pub(crate) fn fee_payer(wallet: &Token, attorney: &Token, author: &Token) -> Hash {
    if !wallet.is_zero() {
        return Hash::of_token(wallet);
    }
    if !attorney.is_zero() {
        return Hash::of_token(attorney);
    }
    Hash::of_token(author)
}

/// A delegated instruction requires a live power of attorney for the
/// `hash(author || attorney)` pair.
pub(crate) async fn check_attorney(
    v: &(dyn InstructionValidator + '_),
    author: &Token,
    attorney: &Token,
) -> Result<(), ValidationError> {
    if attorney.is_zero() {
        return Ok(());
    }
    if v.power_of_attorney(&Hash::of_pair(author, attorney)).await {
        Ok(())
    } else {
        Err(ValidationError::UnknownPrincipal("attorney"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aereum_core::Keypair;

    #[test]
    fn author_signs_when_no_attorney() {
        let author = Keypair::from_seed(&[1; 32]);
        let signature = author.sign(b"msg");
        assert!(check_signature(
            b"msg",
            &signature,
            &Token::ZERO,
            &author.public_key()
        ));
    }

    #[test]
    fn attorney_shadows_author() {
        let author = Keypair::from_seed(&[1; 32]);
        let attorney = Keypair::from_seed(&[2; 32]);
        let signature = attorney.sign(b"msg");
        assert!(check_signature(
            b"msg",
            &signature,
            &attorney.public_key(),
            &author.public_key()
        ));
        // the author's own signature no longer satisfies the chain
        let own = author.sign(b"msg");
        assert!(!check_signature(
            b"msg",
            &own,
            &attorney.public_key(),
            &author.public_key()
        ));
    }

    #[test]
    fn fee_payer_precedence() {
        let author = Token::from_bytes([1; 32]);
        let attorney = Token::from_bytes([2; 32]);
        let wallet = Token::from_bytes([3; 32]);

        assert_eq!(
            fee_payer(&wallet, &attorney, &author),
            Hash::of_token(&wallet)
        );
        assert_eq!(
            fee_payer(&Token::ZERO, &attorney, &author),
            Hash::of_token(&attorney)
        );
        assert_eq!(
            fee_payer(&Token::ZERO, &Token::ZERO, &author),
            Hash::of_token(&author)
        );
    }
}
