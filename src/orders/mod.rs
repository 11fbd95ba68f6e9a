//! Order book and matching engine module.
//!
//! ## Architecture
//!
//! - [`OrderNode`]: slab node with FIFO queue links
//! - [`PriceLevel`]: orders at a single price, oldest first
//! - [`OrderBook`]: per-market book, rebuilt from the store per match run
//! - [`MatchingEngine`]: price-time matching with atomic fill settlement
//! - [`OrdersKeeper`]: placement, cancellation, TTL sweep, queries
//!
//! ## Escrow
//!
//! Placing an order locks its funds in the orders module account: a bid
//! locks the quote amount at its limit price, an ask locks the base
//! quantity. Fills pay out of escrow; cancellation, expiry and fill dust
//! refund the remainder. This is the reservation that makes settlement
//! failures "should not happen" events rather than normal control flow.

pub mod book;
pub mod keeper;
pub mod level;
pub mod matcher;
pub mod node;

pub use book::OrderBook;
pub use keeper::OrdersKeeper;
pub use level::PriceLevel;
pub use matcher::{Fill, MatchResult, MatchingEngine};
pub use node::OrderNode;

use crate::types::{Address, Direction, MarketExtended};

/// Module account holding every live order's locked funds.
pub const ESCROW_ADDRESS: Address = Address([
    0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE,
    0xEE, 0xEE, 0xEE, 0xEE, 0xEE,
]);

/// Store key of an order record. Big-endian ids keep prefix iteration in
/// ascending id order, which every deterministic scan relies on.
pub(crate) fn order_key(id: u64) -> Vec<u8> {
    [b"orders:order:".as_slice(), &id.to_be_bytes()].concat()
}

/// Denomination an order's escrow lock is held in.
pub(crate) fn lock_denom(market: &MarketExtended, direction: Direction) -> &str {
    match direction {
        Direction::Bid => market.quote_denom(),
        Direction::Ask => market.base_denom(),
    }
}
