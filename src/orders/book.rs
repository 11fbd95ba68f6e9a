//! Per-market order book.
//!
//! ## Architecture
//!
//! The book is a transient matching structure, rebuilt deterministically
//! from the persistent store for each matching run:
//!
//! - **Slab**: pre-allocated storage for O(1) node operations
//! - **BTreeMap**: sorted price levels for best bid/ask lookup
//! - **HashMap**: order id to slab key mapping for O(1) lookup
//!
//! Because order ids are assigned sequentially at placement, inserting
//! resting orders in ascending id order reproduces arrival order exactly;
//! FIFO queues per level then give price-time priority with no explicit
//! timestamp comparison. Rebuilding from the store (instead of holding a
//! long-lived book) means a rolled-back transaction can never leave the
//! book out of sync with committed state.
//!
//! ## Price Ordering
//!
//! - **Bids** (buy orders): sorted high-to-low (best bid = highest price)
//! - **Asks** (sell orders): sorted low-to-high (best ask = lowest price)

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use slab::Slab;

use crate::orders::level::PriceLevel;
use crate::orders::node::OrderNode;
use crate::types::{Direction, Order};

/// Order book for a single market.
#[derive(Debug)]
pub struct OrderBook {
    /// Pre-allocated order storage.
    orders: Slab<OrderNode>,

    /// Bid price levels (sorted high to low via `Reverse`).
    bids: BTreeMap<Reverse<u128>, PriceLevel>,

    /// Ask price levels (sorted low to high).
    asks: BTreeMap<u128, PriceLevel>,

    /// Order id to slab key mapping.
    order_index: HashMap<u64, usize>,

    /// Total number of bid orders.
    bid_count: usize,

    /// Total number of ask orders.
    ask_count: usize,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    /// Create a new empty book.
    pub fn new() -> Self {
        Self {
            orders: Slab::new(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
            bid_count: 0,
            ask_count: 0,
        }
    }

    /// Create a book with pre-allocated capacity.
    pub fn with_capacity(order_capacity: usize) -> Self {
        Self {
            orders: Slab::with_capacity(order_capacity),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::with_capacity(order_capacity),
            bid_count: 0,
            ask_count: 0,
        }
    }

    /// Build a book from resting orders.
    ///
    /// Callers must supply orders in ascending id order (the store's
    /// natural iteration order); that ordering is what makes FIFO queues
    /// equal time priority.
    pub fn from_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let mut book = Self::new();
        for order in orders {
            book.insert(order);
        }
        book
    }

    // ========================================================================
    // Capacity and Size
    // ========================================================================

    /// Total number of orders in the book.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Number of bid orders.
    #[inline]
    pub fn bid_count(&self) -> usize {
        self.bid_count
    }

    /// Number of ask orders.
    #[inline]
    pub fn ask_count(&self) -> usize {
        self.ask_count
    }

    /// Check if the book is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of bid price levels.
    #[inline]
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Number of ask price levels.
    #[inline]
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Insert a resting order at the tail of its price level.
    ///
    /// # Returns
    ///
    /// The slab key for the inserted order.
    pub fn insert(&mut self, order: Order) -> usize {
        let order_id = order.id;
        let price = order.price;
        let direction = order.direction;

        let node = OrderNode::new(order);
        let key = self.orders.insert(node);

        self.order_index.insert(order_id, key);

        match direction {
            Direction::Bid => {
                let level = self
                    .bids
                    .entry(Reverse(price))
                    .or_insert_with(|| PriceLevel::new(price));
                level.push_back(key, &mut self.orders);
                self.bid_count += 1;
            }
            Direction::Ask => {
                let level = self
                    .asks
                    .entry(price)
                    .or_insert_with(|| PriceLevel::new(price));
                level.push_back(key, &mut self.orders);
                self.ask_count += 1;
            }
        }

        key
    }

    /// Remove an order by slab key, unlinking it from its price level.
    ///
    /// Empty price levels are dropped.
    ///
    /// # Returns
    ///
    /// The removed order, or None if the key is unknown.
    pub fn remove(&mut self, key: usize) -> Option<Order> {
        let node = self.orders.get(key)?;
        let order_id = node.order_id();
        let price = node.price();
        let direction = node.order.direction;

        match direction {
            Direction::Bid => {
                if let Some(level) = self.bids.get_mut(&Reverse(price)) {
                    level.remove(key, &mut self.orders);
                    self.bid_count -= 1;
                    if level.is_empty() {
                        self.bids.remove(&Reverse(price));
                    }
                }
            }
            Direction::Ask => {
                if let Some(level) = self.asks.get_mut(&price) {
                    level.remove(key, &mut self.orders);
                    self.ask_count -= 1;
                    if level.is_empty() {
                        self.asks.remove(&price);
                    }
                }
            }
        }

        self.order_index.remove(&order_id);
        Some(self.orders.remove(key).order)
    }

    /// Remove an order by order id.
    pub fn remove_by_id(&mut self, order_id: u64) -> Option<Order> {
        let key = *self.order_index.get(&order_id)?;
        self.remove(key)
    }

    /// Get a reference to an order by slab key.
    #[inline]
    pub fn get(&self, key: usize) -> Option<&Order> {
        self.orders.get(key).map(|node| &node.order)
    }

    /// Get a mutable reference to an order node by slab key.
    #[inline]
    pub fn get_node_mut(&mut self, key: usize) -> Option<&mut OrderNode> {
        self.orders.get_mut(key)
    }

    /// Get the slab key for an order id.
    #[inline]
    pub fn key_of(&self, order_id: u64) -> Option<usize> {
        self.order_index.get(&order_id).copied()
    }

    /// Check if an order is in the book.
    #[inline]
    pub fn contains(&self, order_id: u64) -> bool {
        self.order_index.contains_key(&order_id)
    }

    // ========================================================================
    // Best Bid/Ask
    // ========================================================================

    /// Best bid price (highest buy price).
    #[inline]
    pub fn best_bid(&self) -> Option<u128> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best ask price (lowest sell price).
    #[inline]
    pub fn best_ask(&self) -> Option<u128> {
        self.asks.keys().next().copied()
    }

    /// Spread (best_ask - best_bid), when both sides exist.
    pub fn spread(&self) -> Option<u128> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask >= bid => Some(ask - bid),
            _ => None,
        }
    }

    /// Best price level on the side opposite to `direction`, i.e. the level
    /// an incoming order of that direction would match against first.
    pub fn best_counter_level(&self, direction: Direction) -> Option<&PriceLevel> {
        match direction {
            Direction::Bid => self.asks.values().next(),
            Direction::Ask => self.bids.values().next(),
        }
    }

    /// Reduce a level's cached total after a partial fill at `price`.
    pub fn reduce_level_quantity(&mut self, direction: Direction, price: u128, filled: u128) {
        match direction {
            Direction::Bid => {
                if let Some(level) = self.bids.get_mut(&Reverse(price)) {
                    level.reduce_quantity(filled);
                }
            }
            Direction::Ask => {
                if let Some(level) = self.asks.get_mut(&price) {
                    level.reduce_quantity(filled);
                }
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
