//! Spot market types.
//!
//! A market pairs a base asset with a quote asset. The pair is directional:
//! btc/dfi and dfi/btc are distinct markets. Markets are created once and
//! persist indefinitely; ids are assigned sequentially from 0 and never
//! reused.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::currency::Currency;
use crate::types::numeric;

/// Market identifier, sequential from 0.
pub type MarketId = u64;

/// A registered spot market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Unique id, assigned at creation.
    pub id: MarketId,

    /// Base asset denomination (the asset being traded, e.g. "btc").
    pub base_denom: String,

    /// Quote asset denomination (the asset prices are expressed in, e.g. "dfi").
    pub quote_denom: String,
}

impl Market {
    pub fn new(id: MarketId, base_denom: &str, quote_denom: &str) -> Self {
        Self {
            id,
            base_denom: base_denom.to_string(),
            quote_denom: quote_denom.to_string(),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}/{}", self.id, self.base_denom, self.quote_denom)
    }
}

/// Market extended with the resolved currency for both legs.
///
/// A read-only projection composed on demand; never persisted separately.
/// The matching engine uses it for decimal normalization.
///
/// ## Example
///
/// ```
/// use dexnode::types::{Currency, Market, MarketExtended};
///
/// let market = Market::new(0, "btc", "dfi");
/// let ext = MarketExtended::new(market, Currency::new("btc", 8), Currency::new("dfi", 18));
///
/// // 0.5 btc at 2.0 dfi/btc: price is in dfi smallest units per whole btc.
/// let quote = ext.base_to_quote_quantity(2_000_000_000_000_000_000, 50_000_000).unwrap();
/// assert_eq!(quote, 1_000_000_000_000_000_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketExtended {
    /// Market unique id.
    pub id: MarketId,

    /// Base asset currency.
    pub base_currency: Currency,

    /// Quote asset currency.
    pub quote_currency: Currency,
}

impl MarketExtended {
    pub fn new(market: Market, base_currency: Currency, quote_currency: Currency) -> Self {
        Self {
            id: market.id,
            base_currency,
            quote_currency,
        }
    }

    /// Base asset denom.
    pub fn base_denom(&self) -> &str {
        &self.base_currency.denom
    }

    /// Quote asset denom.
    pub fn quote_denom(&self) -> &str {
        &self.quote_currency.denom
    }

    /// Convert a base-asset price and quantity to a quote-asset quantity.
    ///
    /// Quantity is normalized by the base currency's decimals so bid and
    /// ask orders compare on the same basis regardless of how the caller
    /// expressed them. The result truncates; a positive input that
    /// truncates to zero fails with [`Error::InvalidQuantity`].
    pub fn base_to_quote_quantity(&self, price: u128, quantity: u128) -> Result<u128, Error> {
        numeric::base_to_quote_quantity(price, quantity, self.base_currency.decimals)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
