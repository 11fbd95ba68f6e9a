//! Currency registry keeper.
//!
//! Tracks denomination metadata (decimals, supply) and the VM storage paths
//! under which each currency's resources live. Every supply change is
//! mirrored into the VM-visible currency info resource, so on-chain scripts
//! observe the same totals the registry reports.
//!
//! Currencies are created once via governance-style transactions and never
//! deleted. All calls execute within the single-threaded per-block
//! transaction context; the keeper itself holds no mutable state.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::store::{from_bytes, to_bytes, Store};
use crate::types::{validate_denom, Currency, CurrencyParams};
use crate::vm::types::{AccessPath, STDLIB_ADDRESS};

// ============================================================================
// Store keys
// ============================================================================

fn currency_key(denom: &str) -> Vec<u8> {
    [b"currencies:info:".as_slice(), denom.as_bytes()].concat()
}

fn balance_path_key(denom: &str) -> Vec<u8> {
    [b"currencies:path:balance:".as_slice(), denom.as_bytes()].concat()
}

fn info_path_key(denom: &str) -> Vec<u8> {
    [b"currencies:path:info:".as_slice(), denom.as_bytes()].concat()
}

// ============================================================================
// VM resource mirror
// ============================================================================

/// Currency info resource as the VM observes it.
///
/// Written under the currency's info path at the stdlib address on every
/// supply change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CurrencyInfoResource {
    denom: String,
    decimals: u8,
    total_supply: u128,
}

impl From<&Currency> for CurrencyInfoResource {
    fn from(currency: &Currency) -> Self {
        Self {
            denom: currency.denom.clone(),
            decimals: currency.decimals,
            total_supply: currency.supply,
        }
    }
}

// ============================================================================
// Read capability
// ============================================================================

/// Read-only currency lookup consumed by the layers above (markets, orders).
pub trait CurrencyReader {
    /// Resolve a currency snapshot by denom.
    fn currency(&self, store: &dyn Store, denom: &str) -> Result<Currency, Error>;

    /// Existence check.
    fn has_currency(&self, store: &dyn Store, denom: &str) -> bool;
}

// ============================================================================
// CurrencyRegistry
// ============================================================================

/// Currency registry keeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyRegistry;

impl CurrencyRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Register a new currency with zero supply.
    ///
    /// Persists the metadata and both VM storage paths, and seeds the
    /// VM-visible info resource.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidDenom`] - malformed denomination
    /// * [`Error::DenomExists`] - denom already registered
    pub fn create(
        &self,
        store: &mut dyn Store,
        denom: &str,
        params: CurrencyParams,
    ) -> Result<Currency, Error> {
        validate_denom(denom)?;
        if self.has_currency(store, denom) {
            return Err(Error::DenomExists(denom.to_string()));
        }

        let currency = Currency::new(denom, params.decimals);

        // Store VM path objects.
        store.set(&balance_path_key(denom), to_bytes(&params.vm_balance_path));
        store.set(&info_path_key(denom), to_bytes(&params.vm_info_path));

        // Store currency object and its VM mirror.
        store.set(&currency_key(denom), to_bytes(&currency));
        self.mirror_info_resource(store, &currency)?;

        debug!("created currency {:?} ({} decimals)", denom, params.decimals);
        Ok(currency)
    }

    /// Increase the supply of an existing currency.
    pub fn increase_supply(
        &self,
        store: &mut dyn Store,
        denom: &str,
        amount: u128,
    ) -> Result<(), Error> {
        let mut currency = self.currency(store, denom)?;
        currency.supply = currency
            .supply
            .checked_add(amount)
            .ok_or(Error::Overflow("currency supply increase"))?;

        store.set(&currency_key(denom), to_bytes(&currency));
        self.mirror_info_resource(store, &currency)
    }

    /// Decrease the supply of an existing currency.
    ///
    /// Fails with [`Error::InsufficientSupply`] rather than driving the
    /// total negative.
    pub fn decrease_supply(
        &self,
        store: &mut dyn Store,
        denom: &str,
        amount: u128,
    ) -> Result<(), Error> {
        let mut currency = self.currency(store, denom)?;
        if currency.supply < amount {
            return Err(Error::InsufficientSupply {
                denom: denom.to_string(),
                supply: currency.supply,
                amount,
            });
        }
        currency.supply -= amount;

        store.set(&currency_key(denom), to_bytes(&currency));
        self.mirror_info_resource(store, &currency)
    }

    /// VM storage path of the per-account balance resource.
    pub fn balance_path(&self, store: &dyn Store, denom: &str) -> Result<Vec<u8>, Error> {
        store
            .get(&balance_path_key(denom))
            .ok_or_else(|| Error::UnknownDenom(denom.to_string()))
            .and_then(|bytes| from_bytes(&bytes))
    }

    /// VM storage path of the currency info resource.
    pub fn info_path(&self, store: &dyn Store, denom: &str) -> Result<Vec<u8>, Error> {
        store
            .get(&info_path_key(denom))
            .ok_or_else(|| Error::UnknownDenom(denom.to_string()))
            .and_then(|bytes| from_bytes(&bytes))
    }

    /// All registered currencies, ordered by denom.
    pub fn list(&self, store: &dyn Store) -> Vec<Currency> {
        store
            .iter_prefix(b"currencies:info:")
            .into_iter()
            .filter_map(|(_, bytes)| from_bytes(&bytes).ok())
            .collect()
    }

    /// Rewrite the VM-visible info resource for `currency`.
    fn mirror_info_resource(&self, store: &mut dyn Store, currency: &Currency) -> Result<(), Error> {
        let path = self.info_path(store, &currency.denom)?;
        let access_path = AccessPath::new(STDLIB_ADDRESS, path);
        store.set(
            &access_path.storage_key(),
            to_bytes(&CurrencyInfoResource::from(currency)),
        );
        Ok(())
    }
}

impl CurrencyReader for CurrencyRegistry {
    fn currency(&self, store: &dyn Store, denom: &str) -> Result<Currency, Error> {
        store
            .get(&currency_key(denom))
            .ok_or_else(|| Error::UnknownDenom(denom.to_string()))
            .and_then(|bytes| from_bytes(&bytes))
    }

    fn has_currency(&self, store: &dyn Store, denom: &str) -> bool {
        store.has(&currency_key(denom))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
