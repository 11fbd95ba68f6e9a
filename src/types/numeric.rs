//! Integer amount arithmetic across heterogeneous currency decimals.
//!
//! ## Overview
//!
//! Every amount in dexnode is an unsigned integer denominated in a
//! currency's smallest unit: a quantity of `1.5` btc with 8 decimals is
//! `150_000_000`. Prices are quote-asset smallest units per one whole base
//! asset. Currencies declare their own decimals (btc 8, eth/dfi 18, ...),
//! so conversions must scale by the base currency's decimals explicitly.
//!
//! ## Why Integer Math?
//!
//! Floating-point arithmetic can produce different results on different
//! hardware, breaking determinism across validators. All consensus-path
//! arithmetic here is checked `u128`; overflow is a typed error, never a
//! wraparound. `rust_decimal` appears only at the human boundary (parsing
//! amount strings), never in the matching path.
//!
//! ## Truncation Policy
//!
//! Base-to-quote conversion truncates - it never rounds up, so matching can
//! never manufacture quote units out of thin air. A conversion that
//! truncates all the way to zero is rejected instead of silently producing
//! a free trade.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::error::Error;

/// Largest power of ten representable in `u128` (10^38).
pub const MAX_DECIMALS: u8 = 38;

/// 10^decimals as `u128`.
///
/// Returns `None` above [`MAX_DECIMALS`].
///
/// # Example
///
/// ```
/// use dexnode::types::numeric::pow10;
///
/// assert_eq!(pow10(0), Some(1));
/// assert_eq!(pow10(8), Some(100_000_000));
/// assert_eq!(pow10(39), None);
/// ```
pub fn pow10(decimals: u8) -> Option<u128> {
    if decimals > MAX_DECIMALS {
        return None;
    }
    10u128.checked_pow(decimals as u32)
}

/// Convert a base-asset price and quantity into a quote-asset quantity.
///
/// `price` is quote smallest units per one whole base asset; `quantity` is
/// base smallest units. The result is `price * quantity / 10^base_decimals`,
/// truncated.
///
/// # Errors
///
/// * [`Error::Overflow`] - `price * quantity` exceeds `u128`
/// * [`Error::InvalidQuantity`] - the truncated result is zero while both
///   inputs are positive (the quantity is too small to buy a single quote
///   unit; rejecting beats silently trading for nothing)
///
/// # Example
///
/// ```
/// use dexnode::types::numeric::base_to_quote_quantity;
///
/// // 0.5 btc (8 decimals) at 10_000 quote units per btc = 5_000 quote units.
/// assert_eq!(base_to_quote_quantity(10_000, 50_000_000, 8).unwrap(), 5_000);
///
/// // 1 satoshi at a price of 1 quote unit per whole btc truncates to zero.
/// assert!(base_to_quote_quantity(1, 1, 8).is_err());
/// ```
pub fn base_to_quote_quantity(
    price: u128,
    quantity: u128,
    base_decimals: u8,
) -> Result<u128, Error> {
    let scale = pow10(base_decimals).ok_or(Error::Overflow("base decimals"))?;
    let product = price
        .checked_mul(quantity)
        .ok_or(Error::Overflow("base to quote conversion"))?;

    let quote = product / scale;
    if quote == 0 && price > 0 && quantity > 0 {
        return Err(Error::InvalidQuantity("quantity is too small".to_string()));
    }

    Ok(quote)
}

// ============================================================================
// Human boundary conversions
// ============================================================================

/// Parse a decimal amount string into smallest units.
///
/// Rejects negative values, more fractional digits than the currency
/// carries, and values outside `Decimal`'s 96-bit mantissa. Used by the
/// demo binary and tests; consensus code never parses strings.
///
/// # Example
///
/// ```
/// use dexnode::types::numeric::to_units;
///
/// assert_eq!(to_units("1.5", 8), Some(150_000_000));
/// assert_eq!(to_units("0.00000001", 8), Some(1));
/// assert_eq!(to_units("0.000000001", 8), None); // more digits than decimals
/// assert_eq!(to_units("-1", 8), None);
/// ```
pub fn to_units(s: &str, decimals: u8) -> Option<u128> {
    let value = Decimal::from_str(s).ok()?;
    if value.is_sign_negative() {
        return None;
    }
    if value.scale() > decimals as u32 {
        return None;
    }

    let scale = Decimal::from_u128(pow10(decimals)?)?;
    let scaled = value.checked_mul(scale)?;
    scaled.to_u128()
}

/// Format smallest units as a decimal string with full precision.
///
/// # Example
///
/// ```
/// use dexnode::types::numeric::from_units;
///
/// assert_eq!(from_units(150_000_000, 8), "1.50000000");
/// assert_eq!(from_units(1, 8), "0.00000001");
/// assert_eq!(from_units(42, 0), "42");
/// ```
pub fn from_units(value: u128, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    // Pure integer formatting: Decimal's mantissa cannot hold 18-decimal
    // supplies, the store's native u128 can.
    let scale = pow10(decimals).unwrap_or(1);
    let whole = value / scale;
    let frac = value % scale;
    format!("{}.{:0>width$}", whole, frac, width = decimals as usize)
}

/// Format smallest units with trailing fractional zeros trimmed.
///
/// # Example
///
/// ```
/// use dexnode::types::numeric::from_units_trimmed;
///
/// assert_eq!(from_units_trimmed(150_000_000, 8), "1.5");
/// assert_eq!(from_units_trimmed(100_000_000, 8), "1");
/// ```
pub fn from_units_trimmed(value: u128, decimals: u8) -> String {
    let s = from_units(value, decimals);
    match s.find('.') {
        Some(_) => s.trim_end_matches('0').trim_end_matches('.').to_string(),
        None => s,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow10() {
        assert_eq!(pow10(0), Some(1));
        assert_eq!(pow10(18), Some(1_000_000_000_000_000_000));
        assert_eq!(pow10(38), Some(10u128.pow(38)));
        assert_eq!(pow10(39), None);
    }

    #[test]
    fn test_base_to_quote_truncates() {
        // 1.5 base units (1 decimal) at price 3: 3 * 15 / 10 = 4.5 -> 4.
        assert_eq!(base_to_quote_quantity(3, 15, 1).unwrap(), 4);

        // Exact conversion has no truncation loss.
        assert_eq!(
            base_to_quote_quantity(10_000, 100_000_000, 8).unwrap(),
            10_000
        );
    }

    #[test]
    fn test_base_to_quote_rejects_zero_result() {
        let err = base_to_quote_quantity(1, 99, 8).unwrap_err();
        assert!(matches!(err, Error::InvalidQuantity(_)));
    }

    #[test]
    fn test_base_to_quote_zero_inputs_allowed() {
        // Zero inputs are the caller's validation problem; the conversion
        // itself only rejects positive-in, zero-out truncation.
        assert_eq!(base_to_quote_quantity(0, 100, 8).unwrap(), 0);
        assert_eq!(base_to_quote_quantity(100, 0, 8).unwrap(), 0);
    }

    #[test]
    fn test_base_to_quote_overflow() {
        let err = base_to_quote_quantity(u128::MAX, 2, 0).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
    }

    #[test]
    fn test_base_to_quote_large_values() {
        // 18-decimal price times 18-decimal quantity stays within u128.
        let price = 1_000_000_000_000_000_000u128; // 1.0 quote, 18 decimals
        let quantity = 2_000_000_000_000_000_000u128; // 2.0 base, 18 decimals
        assert_eq!(
            base_to_quote_quantity(price, quantity, 18).unwrap(),
            2_000_000_000_000_000_000
        );
    }

    #[test]
    fn test_to_units() {
        assert_eq!(to_units("1", 8), Some(100_000_000));
        assert_eq!(to_units("0.5", 8), Some(50_000_000));
        assert_eq!(to_units("50000.12345678", 8), Some(5_000_012_345_678));
        assert_eq!(to_units("0", 8), Some(0));

        assert_eq!(to_units("abc", 8), None);
        assert_eq!(to_units("", 8), None);
        assert_eq!(to_units("-1.0", 8), None);
        assert_eq!(to_units("1.123456789", 8), None);
    }

    #[test]
    fn test_from_units() {
        assert_eq!(from_units(5_000_012_345_678, 8), "50000.12345678");
        assert_eq!(from_units(0, 8), "0.00000000");
        assert_eq!(from_units(1, 18), "0.000000000000000001");
    }

    #[test]
    fn test_roundtrip() {
        for s in ["1", "0.5", "50000.12345678", "0.00000001"] {
            let units = to_units(s, 8).unwrap();
            let back = from_units_trimmed(units, 8);
            let again = to_units(&back, 8).unwrap();
            assert_eq!(units, again, "roundtrip failed for {}", s);
        }
    }
}
