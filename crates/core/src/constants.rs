//! Fixed constants for capacity scaling.

use alloy_primitives::U256;

/// Decimal places of precision carried by token balances and trust limits.
pub const TOKEN_DECIMALS: u32 = 18;

/// One whole token unit in atomic subunits (`10^18`).
pub const ONE_TOKEN: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Largest scaled capacity that can be stored (fits a signed 64-bit column).
pub const MAX_CAPACITY: u64 = i64::MAX as u64;
