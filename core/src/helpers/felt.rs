use alloy_primitives::{keccak256, U256};
use once_cell::sync::Lazy;

static MASK_250: Lazy<U256> = Lazy::new(|| (U256::from(1u8) << 250usize) - U256::from(1u8));

static U128_MAX: Lazy<U256> = Lazy::new(|| U256::from(u128::MAX));

/// Parses a felt given as `0x` prefixed hex or as a decimal string.
pub fn parse_felt(value: &str) -> Option<U256> {
    let trimmed = value.trim();
    match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some("") => None,
        Some(digits) => U256::from_str_radix(digits, 16).ok(),
        None if trimmed.is_empty() => None,
        None => U256::from_str_radix(trimmed, 10).ok(),
    }
}

/// Rebuilds a cairo `u256` from its `(low, high)` 128 bit limbs.
///
/// Returns `None` when either limb is not a felt or does not fit into 128 bits.
pub fn uint256_from_limbs(low: &str, high: &str) -> Option<U256> {
    let low = parse_felt(low)?;
    let high = parse_felt(high)?;

    if low > *U128_MAX || high > *U128_MAX {
        return None;
    }

    Some(low | (high << 128usize))
}

pub fn split_uint256(value: U256) -> (u128, u128) {
    let limbs = value.as_limbs();
    let low = (limbs[0] as u128) | ((limbs[1] as u128) << 64);
    let high = (limbs[2] as u128) | ((limbs[3] as u128) << 64);
    (low, high)
}

/// Full width (64 digit) lowercase hex, the way Starknet explorers print addresses.
pub fn format_felt(value: U256) -> String {
    let digits = format!("{value:x}");
    format!("0x{digits:0>64}")
}

/// Decodes a cairo short string (up to 31 ascii bytes packed big-endian into a felt).
///
/// Falls back to the hex form when the bytes are not valid utf-8.
pub fn decode_short_string(value: U256) -> String {
    let bytes = value.to_be_bytes::<32>();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());

    match std::str::from_utf8(&bytes[start..]) {
        Ok(text) => text.to_string(),
        Err(_) => format!("0x{value:x}"),
    }
}

/// `sn_keccak`: keccak-256 of the name truncated to the 250 bits a felt can hold.
pub fn starknet_keccak(name: &str) -> U256 {
    let hash = keccak256(name.as_bytes());
    U256::from_be_bytes(hash.0) & *MASK_250
}

pub fn selector_hex(name: &str) -> String {
    format!("0x{:x}", starknet_keccak(name))
}
