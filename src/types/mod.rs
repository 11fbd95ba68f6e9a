//! Core data types for dexnode.
//!
//! ## Types
//!
//! - [`Address`]: fixed-length account address
//! - [`Currency`] / [`CurrencyParams`]: denomination metadata
//! - [`Market`] / [`MarketExtended`]: spot market and its resolved legs
//! - [`Order`] / [`Direction`] / [`OrderStatus`]: limit orders
//! - [`Event`]: ordered transaction events
//!
//! ## Amount Representation
//!
//! All amounts are `u128` in a currency's smallest unit; all arithmetic on
//! them is checked. See [`numeric`] for the conversion rules.

mod address;
mod currency;
mod event;
mod market;
mod order;

pub mod hexbytes;
pub mod numeric;

// Re-export all types at module level
pub use address::{Address, ADDRESS_LENGTH};
pub use currency::{validate_denom, Currency, CurrencyParams};
pub use event::{Attribute, Event};
pub use market::{Market, MarketExtended, MarketId};
pub use order::{Direction, Order, OrderStatus};
