//! Market registry keeper.
//!
//! Maps directional base/quote pairs to sequential market ids and composes
//! currency metadata into the [`MarketExtended`] view the matching engine
//! consumes. Markets are created once and never deleted.

use log::debug;

use crate::currencies::CurrencyReader;
use crate::error::Error;
use crate::store::{from_bytes, to_bytes, Store};
use crate::types::{validate_denom, Market, MarketExtended, MarketId};

// ============================================================================
// Store keys
// ============================================================================

const NEXT_ID_KEY: &[u8] = b"markets:next_id";

fn market_key(id: MarketId) -> Vec<u8> {
    // Big-endian id keeps iteration in ascending id order.
    [b"markets:market:".as_slice(), &id.to_be_bytes()].concat()
}

fn pair_key(base: &str, quote: &str) -> Vec<u8> {
    [
        b"markets:pair:".as_slice(),
        base.as_bytes(),
        b":".as_slice(),
        quote.as_bytes(),
    ]
    .concat()
}

// ============================================================================
// Read capability
// ============================================================================

/// "Resolve a market by id" - the one capability the order book needs.
pub trait MarketSource {
    fn market_extended(&self, store: &dyn Store, id: MarketId) -> Result<MarketExtended, Error>;
}

/// Bundles the market registry with a currency reader into a [`MarketSource`].
pub struct MarketDirectory<'a, C: CurrencyReader> {
    pub markets: &'a MarketRegistry,
    pub currencies: &'a C,
}

impl<C: CurrencyReader> MarketSource for MarketDirectory<'_, C> {
    fn market_extended(&self, store: &dyn Store, id: MarketId) -> Result<MarketExtended, Error> {
        let market = self.markets.get(store, id)?;
        self.markets.to_extended(store, self.currencies, &market)
    }
}

// ============================================================================
// MarketRegistry
// ============================================================================

/// Market registry keeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketRegistry;

impl MarketRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Register a new market for a directional base/quote pair.
    ///
    /// The pair is directional: btc/dfi and dfi/btc are distinct markets.
    /// Both legs must be distinct, valid denominations already known to the
    /// currency registry. Ids are assigned sequentially from 0.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidDenom`] - malformed or identical denominations
    /// * [`Error::UnknownDenom`] - either leg is not registered
    /// * [`Error::MarketExists`] - pair already registered
    pub fn create(
        &self,
        store: &mut dyn Store,
        currencies: &impl CurrencyReader,
        base_denom: &str,
        quote_denom: &str,
    ) -> Result<Market, Error> {
        validate_denom(base_denom)?;
        validate_denom(quote_denom)?;
        if base_denom == quote_denom {
            return Err(Error::InvalidDenom(format!(
                "{}/{}: base and quote must differ",
                base_denom, quote_denom
            )));
        }

        // Both legs must exist before a market can reference them.
        currencies.currency(store, base_denom)?;
        currencies.currency(store, quote_denom)?;

        if store.has(&pair_key(base_denom, quote_denom)) {
            return Err(Error::MarketExists {
                base: base_denom.to_string(),
                quote: quote_denom.to_string(),
            });
        }

        let id = self.next_id(store);
        let market = Market::new(id, base_denom, quote_denom);

        store.set(&market_key(id), to_bytes(&market));
        store.set(&pair_key(base_denom, quote_denom), to_bytes(&id));
        store.set(NEXT_ID_KEY, to_bytes(&(id + 1)));

        debug!("created market {}", market);
        Ok(market)
    }

    /// Resolve a market by its directional pair.
    pub fn resolve(
        &self,
        store: &dyn Store,
        base_denom: &str,
        quote_denom: &str,
    ) -> Result<Market, Error> {
        let id: MarketId = store
            .get(&pair_key(base_denom, quote_denom))
            .ok_or_else(|| Error::UnknownMarket(format!("{}/{}", base_denom, quote_denom)))
            .and_then(|bytes| from_bytes(&bytes))?;
        self.get(store, id)
    }

    /// Resolve a market by id.
    pub fn get(&self, store: &dyn Store, id: MarketId) -> Result<Market, Error> {
        store
            .get(&market_key(id))
            .ok_or_else(|| Error::UnknownMarket(format!("#{}", id)))
            .and_then(|bytes| from_bytes(&bytes))
    }

    /// Compose the extended view with both legs' currencies resolved.
    ///
    /// The legs are re-checked defensively: registry invariants make a
    /// vanished leg impossible, but a corrupted store must surface as a
    /// typed error, not a panic.
    pub fn to_extended(
        &self,
        store: &dyn Store,
        currencies: &impl CurrencyReader,
        market: &Market,
    ) -> Result<MarketExtended, Error> {
        let base = currencies.currency(store, &market.base_denom)?;
        let quote = currencies.currency(store, &market.quote_denom)?;
        Ok(MarketExtended::new(market.clone(), base, quote))
    }

    /// All markets in ascending id order.
    pub fn list(&self, store: &dyn Store) -> Vec<Market> {
        store
            .iter_prefix(b"markets:market:")
            .into_iter()
            .filter_map(|(_, bytes)| from_bytes(&bytes).ok())
            .collect()
    }

    fn next_id(&self, store: &dyn Store) -> MarketId {
        store
            .get(NEXT_ID_KEY)
            .and_then(|bytes| from_bytes(&bytes).ok())
            .unwrap_or(0)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
