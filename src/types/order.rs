//! Order types for the matching engine.
//!
//! ## Lifecycle
//!
//! ```text
//! Open -> PartiallyFilled -> ... -> Filled
//!      \-> Cancelled        \-> Cancelled | Expired
//!      \-> Expired
//! ```
//!
//! `Filled`, `Cancelled` and `Expired` are terminal; a terminal order is
//! deleted from the store and survives only in the emitted event. An order
//! keeps its original creation timestamp across partial fills, so it never
//! loses its place in price-time priority.

use serde::{Deserialize, Serialize};

use crate::types::address::Address;
use crate::types::market::MarketId;

// ============================================================================
// Direction enum
// ============================================================================

/// Order direction: bid (buy base) or ask (sell base).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Buy the base asset, pay in quote.
    #[default]
    Bid,
    /// Sell the base asset, receive quote.
    Ask,
}

impl Direction {
    /// Returns the opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bid => Direction::Ask,
            Direction::Ask => Direction::Bid,
        }
    }

    /// Lowercase label used in events and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bid => "bid",
            Direction::Ask => "ask",
        }
    }
}

// ============================================================================
// OrderStatus enum
// ============================================================================

/// Observable order state, derived for reporting and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Resting, untouched.
    Open,
    /// Resting with some quantity already executed.
    PartiallyFilled,
    /// Fully executed. Terminal.
    Filled,
    /// Removed by its owner. Terminal.
    Cancelled,
    /// Removed by the TTL sweep. Terminal.
    Expired,
}

impl OrderStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    /// Lowercase label used in events.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }
}

// ============================================================================
// Order struct
// ============================================================================

/// A limit order resting in (or passing through) the book.
///
/// Prices are quote smallest units per whole base asset; quantities are
/// base smallest units. Both are validated strictly positive at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order id, sequential from 0.
    pub id: u64,

    /// Owner account.
    pub owner: Address,

    /// Market the order trades on.
    pub market_id: MarketId,

    /// Bid or ask.
    pub direction: Direction,

    /// Quote smallest units per one whole base asset.
    pub price: u128,

    /// Original quantity in base smallest units.
    pub quantity: u128,

    /// Remaining unexecuted quantity. Decremented by fills.
    pub remaining: u128,

    /// Funds still held in the orders escrow for this order:
    /// quote units for a bid, base units for an ask.
    pub locked: u128,

    /// Seconds after `created_at` at which the order expires.
    pub ttl_secs: u64,

    /// Block time at placement (unix seconds). Never changes; this is the
    /// order's position in time priority.
    pub created_at: u64,

    /// Block time of the last mutation (unix seconds). Metadata only.
    pub updated_at: u64,
}

impl Order {
    /// Create a new open order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        owner: Address,
        market_id: MarketId,
        direction: Direction,
        price: u128,
        quantity: u128,
        locked: u128,
        ttl_secs: u64,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            owner,
            market_id,
            direction,
            price,
            quantity,
            remaining: quantity,
            locked,
            ttl_secs,
            created_at,
            updated_at: created_at,
        }
    }

    /// Check if the order is fully filled.
    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    /// Quantity already executed.
    pub fn filled_quantity(&self) -> u128 {
        self.quantity.saturating_sub(self.remaining)
    }

    /// Fill a portion of this order.
    ///
    /// Returns the actual quantity filled (capped at `remaining`).
    pub fn fill(&mut self, fill_qty: u128) -> u128 {
        let actual = fill_qty.min(self.remaining);
        self.remaining -= actual;
        actual
    }

    /// Current observable status of a live (stored) order.
    pub fn status(&self) -> OrderStatus {
        if self.remaining == 0 {
            OrderStatus::Filled
        } else if self.remaining < self.quantity {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Open
        }
    }

    /// Block time at which the order expires (saturating).
    pub fn expires_at(&self) -> u64 {
        self.created_at.saturating_add(self.ttl_secs)
    }

    /// True once `block_time` reaches the expiry instant.
    pub fn is_expired(&self, block_time: u64) -> bool {
        block_time >= self.expires_at()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order::new(
            1,
            Address::from_tag(0x11),
            0,
            Direction::Bid,
            1_000_000_000_000_000_000,
            100_000_000,
            1_000_000_000_000_000_000,
            60,
            100,
        )
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::Bid.opposite(), Direction::Ask);
        assert_eq!(Direction::Ask.opposite(), Direction::Bid);
    }

    #[test]
    fn test_order_new() {
        let order = sample_order();
        assert_eq!(order.remaining, order.quantity);
        assert_eq!(order.updated_at, order.created_at);
        assert_eq!(order.status(), OrderStatus::Open);
        assert!(!order.is_filled());
    }

    #[test]
    fn test_order_fill_transitions() {
        let mut order = sample_order();

        // Partial fill.
        let filled = order.fill(40_000_000);
        assert_eq!(filled, 40_000_000);
        assert_eq!(order.remaining, 60_000_000);
        assert_eq!(order.filled_quantity(), 40_000_000);
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);

        // Fill the rest.
        let filled = order.fill(60_000_000);
        assert_eq!(filled, 60_000_000);
        assert!(order.is_filled());
        assert_eq!(order.status(), OrderStatus::Filled);
    }

    #[test]
    fn test_order_overfill_capped() {
        let mut order = sample_order();
        let filled = order.fill(u128::MAX);
        assert_eq!(filled, 100_000_000);
        assert_eq!(order.remaining, 0);
    }

    #[test]
    fn test_order_expiry_boundary() {
        let order = sample_order(); // created_at = 100, ttl = 60

        assert!(!order.is_expired(100));
        assert!(!order.is_expired(159));
        assert!(order.is_expired(160));
        assert!(order.is_expired(161));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(!OrderStatus::Open.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }

    #[test]
    fn test_order_serde_roundtrip() {
        let order = sample_order();
        let bytes = crate::store::to_bytes(&order);
        let back: Order = crate::store::from_bytes(&bytes).unwrap();
        assert_eq!(order, back);
    }
}
