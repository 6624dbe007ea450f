//! Address and amount normalization for upstream records.

use alloy_primitives::{Address, U256};

use crate::error::{CoreError, Result};

/// Normalize an address string to an [`Address`].
///
/// Accepts `0x`-prefixed or bare hex in any letter case. The canonical textual
/// form of the result is its EIP-55 checksum (`address.to_checksum(None)`).
///
/// # Example
///
/// ```
/// use trustgraph_core::address::normalize_address;
///
/// let a = normalize_address("0x52908400098527886e0f7030069857d2e4169ee7").unwrap();
/// let b = normalize_address("52908400098527886E0F7030069857D2E4169EE7").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(
///     a.to_checksum(None),
///     "0x52908400098527886E0F7030069857D2E4169EE7"
/// );
/// ```
pub fn normalize_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidAddress(input.to_string()));
    }

    hex.parse::<Address>()
        .map_err(|_| CoreError::InvalidAddress(input.to_string()))
}

/// Parse a full-precision amount (atomic subunits) from a decimal string.
pub fn parse_amount(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::InvalidAmount(input.to_string()));
    }

    U256::from_str_radix(trimmed, 10).map_err(|_| CoreError::InvalidAmount(input.to_string()))
}
