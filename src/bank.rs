//! Balance-transfer capability.
//!
//! The real chain delegates balance arithmetic to its bank module; the
//! kernel only needs the narrow capability below. [`StoreBank`] is the
//! store-backed implementation used by tests and the demo binary; the
//! matching engine and the registries talk to the trait, never the type.

use crate::error::Error;
use crate::store::{from_bytes, to_bytes, Store};
use crate::types::Address;

/// Narrow balance capability consumed by the order settlement path.
pub trait BalanceOps {
    /// Credit `amount` of `denom` to `address`.
    fn deposit(
        &self,
        store: &mut dyn Store,
        address: &Address,
        denom: &str,
        amount: u128,
    ) -> Result<(), Error>;

    /// Debit `amount` of `denom` from `address`.
    ///
    /// Fails with [`Error::InsufficientFunds`] when the balance is short.
    fn withdraw(
        &self,
        store: &mut dyn Store,
        address: &Address,
        denom: &str,
        amount: u128,
    ) -> Result<(), Error>;

    /// Current balance. Absent accounts hold zero.
    fn balance_of(&self, store: &dyn Store, address: &Address, denom: &str) -> u128;

    /// Move funds between two accounts; debit first, so an overdraw fails
    /// before any credit happens.
    fn transfer(
        &self,
        store: &mut dyn Store,
        from: &Address,
        to: &Address,
        denom: &str,
        amount: u128,
    ) -> Result<(), Error> {
        self.withdraw(store, from, denom, amount)?;
        self.deposit(store, to, denom, amount)
    }
}

// ============================================================================
// StoreBank
// ============================================================================

/// Store-backed balance book.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreBank;

impl StoreBank {
    pub fn new() -> Self {
        Self
    }

    fn balance_key(address: &Address, denom: &str) -> Vec<u8> {
        let mut key = b"bank:balance:".to_vec();
        key.extend_from_slice(address.as_bytes());
        key.push(b':');
        key.extend_from_slice(denom.as_bytes());
        key
    }
}

impl BalanceOps for StoreBank {
    fn deposit(
        &self,
        store: &mut dyn Store,
        address: &Address,
        denom: &str,
        amount: u128,
    ) -> Result<(), Error> {
        let balance = self.balance_of(store, address, denom);
        let updated = balance
            .checked_add(amount)
            .ok_or(Error::Overflow("balance deposit"))?;
        store.set(&Self::balance_key(address, denom), to_bytes(&updated));
        Ok(())
    }

    fn withdraw(
        &self,
        store: &mut dyn Store,
        address: &Address,
        denom: &str,
        amount: u128,
    ) -> Result<(), Error> {
        let balance = self.balance_of(store, address, denom);
        if balance < amount {
            return Err(Error::InsufficientFunds {
                address: address.to_string(),
                denom: denom.to_string(),
                balance,
                amount,
            });
        }
        store.set(
            &Self::balance_key(address, denom),
            to_bytes(&(balance - amount)),
        );
        Ok(())
    }

    fn balance_of(&self, store: &dyn Store, address: &Address, denom: &str) -> u128 {
        store
            .get(&Self::balance_key(address, denom))
            .and_then(|bytes| from_bytes::<u128>(&bytes).ok())
            .unwrap_or(0)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn setup() -> (MemStore, StoreBank, Address, Address) {
        (
            MemStore::new(),
            StoreBank::new(),
            Address::from_tag(1),
            Address::from_tag(2),
        )
    }

    #[test]
    fn test_deposit_and_balance() {
        let (mut store, bank, alice, _) = setup();

        assert_eq!(bank.balance_of(&store, &alice, "btc"), 0);
        bank.deposit(&mut store, &alice, "btc", 100).unwrap();
        bank.deposit(&mut store, &alice, "btc", 50).unwrap();
        assert_eq!(bank.balance_of(&store, &alice, "btc"), 150);

        // Denoms are independent.
        assert_eq!(bank.balance_of(&store, &alice, "dfi"), 0);
    }

    #[test]
    fn test_withdraw_insufficient() {
        let (mut store, bank, alice, _) = setup();
        bank.deposit(&mut store, &alice, "btc", 10).unwrap();

        let err = bank.withdraw(&mut store, &alice, "btc", 11).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        // Balance untouched by the failed withdraw.
        assert_eq!(bank.balance_of(&store, &alice, "btc"), 10);
    }

    #[test]
    fn test_transfer() {
        let (mut store, bank, alice, bob) = setup();
        bank.deposit(&mut store, &alice, "dfi", 100).unwrap();

        bank.transfer(&mut store, &alice, &bob, "dfi", 40).unwrap();
        assert_eq!(bank.balance_of(&store, &alice, "dfi"), 60);
        assert_eq!(bank.balance_of(&store, &bob, "dfi"), 40);

        // Overdraw fails without touching either account.
        assert!(bank.transfer(&mut store, &alice, &bob, "dfi", 61).is_err());
        assert_eq!(bank.balance_of(&store, &alice, "dfi"), 60);
        assert_eq!(bank.balance_of(&store, &bob, "dfi"), 40);
    }

    #[test]
    fn test_deposit_overflow() {
        let (mut store, bank, alice, _) = setup();
        bank.deposit(&mut store, &alice, "btc", u128::MAX).unwrap();

        let err = bank.deposit(&mut store, &alice, "btc", 1).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
    }
}
