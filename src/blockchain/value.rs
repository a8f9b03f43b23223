//! Monetary value normalization.
//!
//! Values arrive as text, either `0x`-prefixed hex or a base-10 literal, and
//! leave as the minimal big-endian byte string of the same integer. Every
//! spelling of one integer maps to the same bytes.

use alloy::hex;
use alloy::primitives::U256;

use crate::blockchain::types::{TxError, TxResult};

/// Maximum encoded width of a value.
pub const MAX_VALUE_BYTES: usize = 32;

/// Parse a decimal or `0x`-prefixed hex amount into a 256-bit integer.
pub fn parse_value(input: &str) -> TxResult<U256> {
    let malformed = |reason: &str| TxError::MalformedValue {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (digits, radix) = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex_digits) => {
            if !hex_digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(malformed("invalid hex digit"));
            }
            (hex_digits, 16)
        }
        None => {
            if !input.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed("not a decimal or 0x-prefixed hex integer"));
            }
            (input, 10)
        }
    };

    if digits.is_empty() {
        return Err(malformed("no digits"));
    }

    U256::from_str_radix(digits, radix).map_err(|_| malformed("exceeds 256 bits"))
}

/// Minimal big-endian bytes of a value; zero encodes as a single `0x00`.
pub fn encode_value(value: U256) -> Vec<u8> {
    let full = value.to_be_bytes::<MAX_VALUE_BYTES>();
    let first = full
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(MAX_VALUE_BYTES - 1);
    full[first..].to_vec()
}

/// Decode big-endian value bytes back into an integer.
pub fn decode_value(bytes: &[u8]) -> TxResult<U256> {
    if bytes.len() > MAX_VALUE_BYTES {
        return Err(TxError::MalformedEnvelope(format!(
            "value field is {} bytes, at most {} allowed",
            bytes.len(),
            MAX_VALUE_BYTES
        )));
    }
    let mut padded = [0u8; MAX_VALUE_BYTES];
    padded[MAX_VALUE_BYTES - bytes.len()..].copy_from_slice(bytes);
    Ok(U256::from_be_bytes(padded))
}

/// Normalize an amount to canonical big-endian bytes.
pub fn value_to_bytes(input: &str) -> TxResult<Vec<u8>> {
    parse_value(input).map(encode_value)
}

/// Normalize an amount to canonical lowercase hex digits without prefix.
pub fn normalize_value(input: &str) -> TxResult<String> {
    value_to_bytes(input).map(hex::encode)
}
