//! Currency metadata types.
//!
//! A currency is registered once via a governance-style transaction and
//! never deleted. Decimals are immutable after creation; supply moves only
//! through the registry's issue/withdraw operations.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::numeric;

/// Registered currency snapshot.
///
/// ## Example
///
/// ```
/// use dexnode::types::Currency;
///
/// let btc = Currency::new("btc", 8);
/// assert_eq!(btc.decimals, 8);
/// assert_eq!(btc.supply, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Denomination, unique within the registry (e.g. "btc").
    pub denom: String,

    /// Number of fractional digits in the smallest unit.
    /// Immutable after creation.
    pub decimals: u8,

    /// Total supply in smallest units. Never negative by construction.
    pub supply: u128,
}

impl Currency {
    /// Create a currency with zero initial supply.
    pub fn new(denom: &str, decimals: u8) -> Self {
        Self {
            denom: denom.to_string(),
            decimals,
            supply: 0,
        }
    }

    /// One whole unit expressed in smallest units (10^decimals).
    pub fn unit(&self) -> u128 {
        numeric::pow10(self.decimals).unwrap_or(1)
    }

    /// Supply formatted as a whole-unit decimal string.
    pub fn supply_display(&self) -> String {
        numeric::from_units_trimmed(self.supply, self.decimals)
    }
}

/// Creation parameters for a currency.
///
/// The VM paths locate the balance and info resources inside the Move VM's
/// storage so on-chain scripts observe the same totals the registry tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyParams {
    /// Number of fractional digits in the smallest unit.
    pub decimals: u8,

    /// VM storage path of the per-account balance resource.
    #[serde(with = "crate::types::hexbytes")]
    pub vm_balance_path: Vec<u8>,

    /// VM storage path of the currency info resource.
    #[serde(with = "crate::types::hexbytes")]
    pub vm_info_path: Vec<u8>,
}

impl CurrencyParams {
    pub fn new(decimals: u8, vm_balance_path: Vec<u8>, vm_info_path: Vec<u8>) -> Self {
        Self {
            decimals,
            vm_balance_path,
            vm_info_path,
        }
    }
}

/// Validate a denomination string.
///
/// Denoms are short lowercase alphanumeric tags starting with a letter
/// ("btc", "usdt", "dfi").
pub fn validate_denom(denom: &str) -> Result<(), Error> {
    let valid = denom.len() >= 2
        && denom.len() <= 16
        && denom.starts_with(|c: char| c.is_ascii_lowercase())
        && denom
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidDenom(denom.to_string()))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_new() {
        let eth = Currency::new("eth", 18);
        assert_eq!(eth.denom, "eth");
        assert_eq!(eth.decimals, 18);
        assert_eq!(eth.supply, 0);
        assert_eq!(eth.unit(), 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_supply_display() {
        let mut btc = Currency::new("btc", 8);
        btc.supply = 2_150_000_000;
        assert_eq!(btc.supply_display(), "21.5");
    }

    #[test]
    fn test_validate_denom() {
        assert!(validate_denom("btc").is_ok());
        assert!(validate_denom("usdt").is_ok());
        assert!(validate_denom("coin2").is_ok());

        assert!(validate_denom("").is_err());
        assert!(validate_denom("b").is_err());
        assert!(validate_denom("BTC").is_err());
        assert!(validate_denom("2coin").is_err());
        assert!(validate_denom("btc-usd").is_err());
        assert!(validate_denom("averyveryverylongdenom").is_err());
    }

    #[test]
    fn test_currency_serde_roundtrip() {
        let mut cur = Currency::new("btc", 8);
        cur.supply = u128::MAX;

        let bytes = crate::store::to_bytes(&cur);
        let back: Currency = crate::store::from_bytes(&bytes).unwrap();
        assert_eq!(cur, back);
    }
}
