/// Canonical form of a Starknet hex value: `0x` prefix, lowercase, no leading zeros.
///
/// Addresses and selectors arrive with inconsistent zero-padding depending on the source
/// (`0x049d...` vs `0x49d...`), so every comparison goes through this.
pub fn normalize_hex(value: &str) -> String {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .trim_start_matches('0');

    if digits.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{}", digits.to_ascii_lowercase())
    }
}

pub fn hex_eq(a: &str, b: &str) -> bool {
    normalize_hex(a) == normalize_hex(b)
}

pub fn is_hex_string(value: &str) -> bool {
    let trimmed = value.trim();
    match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
