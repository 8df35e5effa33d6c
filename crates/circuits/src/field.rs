//! Field element parsing and rendering.
//!
//! Identifiers, payment ids and roots cross process boundaries as strings:
//! `0x`-prefixed big-endian hex or plain decimal. Values at or above the
//! BN254 scalar modulus are rejected rather than reduced, so two distinct
//! strings can never name the same field element.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ark_std::rand::RngCore;
use num_bigint::BigUint;
use num_traits::Num;
use thiserror::Error;

/// Bytes in a random identifier (matches 128-bit hex identifiers).
pub const IDENTIFIER_BYTES: usize = 16;

/// Errors while parsing a field element.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Malformed field element: {0:?}")]
    Malformed(String),
    #[error("Value exceeds the field modulus: {0}")]
    OutOfRange(String),
}

/// Parse a field element from `0x`-prefixed hex or decimal.
pub fn parse_field(input: &str) -> Result<Fr, FieldError> {
    let trimmed = input.trim();

    let value = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(digits) => {
            if digits.is_empty() {
                return Err(FieldError::Malformed(input.to_string()));
            }
            let padded = if digits.len() % 2 == 1 {
                format!("0{}", digits)
            } else {
                digits.to_string()
            };
            let bytes =
                hex::decode(&padded).map_err(|_| FieldError::Malformed(input.to_string()))?;
            BigUint::from_bytes_be(&bytes)
        }
        None => {
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Err(FieldError::Malformed(input.to_string()));
            }
            BigUint::from_str_radix(trimmed, 10)
                .map_err(|_| FieldError::Malformed(input.to_string()))?
        }
    };

    if value >= BigUint::from(Fr::MODULUS) {
        return Err(FieldError::OutOfRange(input.to_string()));
    }

    Ok(Fr::from_be_bytes_mod_order(&value.to_bytes_be()))
}

/// Render a field element as a decimal string.
pub fn to_decimal(value: &Fr) -> String {
    BigUint::from(value.into_bigint()).to_str_radix(10)
}

/// Render a field element as `0x` + 64 hex characters (big-endian).
pub fn to_hex(value: &Fr) -> String {
    format!("0x{}", hex::encode(value.into_bigint().to_bytes_be()))
}

/// Draw a fresh 128-bit identifier.
pub fn random_identifier<R: RngCore + ?Sized>(rng: &mut R) -> Fr {
    let mut bytes = [0u8; IDENTIFIER_BYTES];
    rng.fill_bytes(&mut bytes);
    Fr::from_be_bytes_mod_order(&bytes)
}
