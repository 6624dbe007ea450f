//! Capacity scaling.
//!
//! Balances and trust limits carry 18 decimal places. The path solver works on
//! small whole-number capacities, so raw capacities are divided by `10^18` and
//! floored. Fractional units are truncated; a capacity below one whole unit
//! scales to zero.

use alloy_primitives::U256;

use crate::constants::{MAX_CAPACITY, ONE_TOKEN};
use crate::error::{CoreError, Result};

/// Scale a raw capacity (atomic subunits) down to whole units, flooring.
///
/// # Errors
///
/// Returns `CoreError::CapacityOverflow` if the scaled value exceeds
/// [`MAX_CAPACITY`].
///
/// # Example
///
/// ```
/// use trustgraph_core::{scale_capacity, U256};
///
/// let raw = U256::from(5_999_999_999_999_999_999u128);
/// assert_eq!(scale_capacity(raw).unwrap(), 5);
///
/// let dust = U256::from(999_999_999_999_999_999u64);
/// assert_eq!(scale_capacity(dust).unwrap(), 0);
/// ```
pub fn scale_capacity(raw: U256) -> Result<u64> {
    let scaled = raw / ONE_TOKEN;
    if scaled > U256::from(MAX_CAPACITY) {
        return Err(CoreError::CapacityOverflow(raw));
    }
    Ok(scaled.as_limbs()[0])
}

/// Whole units expressed in atomic subunits (`units * 10^18`).
pub fn whole_units(units: u64) -> U256 {
    U256::from(units) * ONE_TOKEN
}
