//! Orders keeper: placement, cancellation, expiry, queries.
//!
//! The keeper owns the persistent order records and the escrow lifecycle;
//! the actual crossing is delegated to [`MatchingEngine`]. Everything here
//! runs inside the single-threaded per-block transaction context, and every
//! scan iterates the store in ascending order-id order so all validators
//! process the same orders in the same sequence.

use log::{debug, info};

use crate::bank::BalanceOps;
use crate::error::Error;
use crate::markets::MarketSource;
use crate::orders::book::OrderBook;
use crate::orders::matcher::{Fill, MatchingEngine};
use crate::orders::{lock_denom, order_key, ESCROW_ADDRESS};
use crate::store::{from_bytes, to_bytes, Store};
use crate::types::{Address, Direction, Event, MarketId, Order, OrderStatus};

const NEXT_ID_KEY: &[u8] = b"orders:next_id";
const ORDER_PREFIX: &[u8] = b"orders:order:";

/// Result of a `PlaceOrder` call.
#[derive(Debug)]
pub struct PlaceOutcome {
    /// Id assigned to the new order.
    pub order_id: u64,

    /// State the order ended the call in. `Filled` orders are already gone
    /// from the store; `Open`/`PartiallyFilled` orders rest on the book.
    pub status: OrderStatus,

    /// Fills executed during immediate matching, in execution order.
    pub fills: Vec<Fill>,
}

/// Orders module keeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdersKeeper {
    engine: MatchingEngine,
}

impl OrdersKeeper {
    pub fn new() -> Self {
        Self {
            engine: MatchingEngine::new(),
        }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Place a limit order: validate, lock funds, match immediately, rest
    /// the remainder.
    ///
    /// # Errors
    ///
    /// * [`Error::UnknownMarket`] - market id not registered
    /// * [`Error::InvalidPrice`] / [`Error::InvalidQuantity`] - non-positive
    ///   inputs, or a bid whose quote conversion truncates to zero
    /// * [`Error::InsufficientFunds`] - owner cannot cover the escrow lock
    #[allow(clippy::too_many_arguments)]
    pub fn place_order(
        &self,
        store: &mut dyn Store,
        markets: &impl MarketSource,
        bank: &impl BalanceOps,
        events: &mut Vec<Event>,
        owner: Address,
        market_id: MarketId,
        direction: Direction,
        price: u128,
        quantity: u128,
        ttl_secs: u64,
        block_time: u64,
    ) -> Result<PlaceOutcome, Error> {
        let market = markets.market_extended(store, market_id)?;

        if price == 0 {
            return Err(Error::InvalidPrice);
        }
        if quantity == 0 {
            return Err(Error::InvalidQuantity(
                "quantity must be greater than zero".to_string(),
            ));
        }

        // Escrow lock. For a bid this is also the zero-quote guard: a
        // quantity too small to convert is rejected here, before any state
        // change.
        let locked = match direction {
            Direction::Bid => market.base_to_quote_quantity(price, quantity)?,
            Direction::Ask => quantity,
        };

        let id = self.next_id(store);
        let mut order = Order::new(
            id, owner, market_id, direction, price, quantity, locked, ttl_secs, block_time,
        );

        bank.transfer(
            store,
            &owner,
            &ESCROW_ADDRESS,
            lock_denom(&market, direction),
            locked,
        )?;

        store.set(&order_key(id), to_bytes(&order));
        store.set(NEXT_ID_KEY, to_bytes(&(id + 1)));

        events.push(
            Event::new("order_posted")
                .attr("order_id", id)
                .attr("owner", owner)
                .attr("market_id", market_id)
                .attr("direction", direction.as_str())
                .attr("price", price)
                .attr("quantity", quantity)
                .attr("ttl_secs", ttl_secs),
        );

        // Immediate matching against the resting book (which excludes the
        // order just stored).
        let mut book = self.build_book(store, market_id, Some(id));
        let result = self.engine.match_order(
            store, &mut book, &mut order, &market, bank, events, block_time,
        )?;

        let status = if order.is_filled() {
            // Refund truncation dust and retire the record.
            if order.locked > 0 {
                bank.transfer(
                    store,
                    &ESCROW_ADDRESS,
                    &owner,
                    lock_denom(&market, direction),
                    order.locked,
                )?;
            }
            store.delete(&order_key(id));
            events.push(
                Event::new("order_filled")
                    .attr("order_id", id)
                    .attr("owner", owner),
            );
            OrderStatus::Filled
        } else {
            if !result.fills.is_empty() {
                store.set(&order_key(id), to_bytes(&order));
            }
            order.status()
        };

        debug!(
            "order {} placed on market {}: {} ({} fills)",
            id,
            market_id,
            status.as_str(),
            result.fills.len()
        );

        Ok(PlaceOutcome {
            order_id: id,
            status,
            fills: result.fills,
        })
    }

    /// Cancel a live order and refund its escrow remainder.
    ///
    /// # Errors
    ///
    /// * [`Error::UnknownOrder`] - absent (or already terminal) order
    /// * [`Error::NotOwner`] - sender does not own the order
    pub fn cancel_order(
        &self,
        store: &mut dyn Store,
        markets: &impl MarketSource,
        bank: &impl BalanceOps,
        events: &mut Vec<Event>,
        sender: Address,
        order_id: u64,
    ) -> Result<Order, Error> {
        let order = self.get(store, order_id)?;
        if order.owner != sender {
            return Err(Error::NotOwner);
        }

        let market = markets.market_extended(store, order.market_id)?;
        if order.locked > 0 {
            bank.transfer(
                store,
                &ESCROW_ADDRESS,
                &order.owner,
                lock_denom(&market, order.direction),
                order.locked,
            )?;
        }
        store.delete(&order_key(order_id));

        events.push(
            Event::new("order_cancelled")
                .attr("order_id", order_id)
                .attr("owner", order.owner),
        );

        Ok(order)
    }

    /// Remove every order whose TTL elapsed, refunding escrow remainders.
    ///
    /// Invoked once per block. Scans in ascending order-id order so every
    /// validator expires the same set in the same block. Returns the number
    /// of expired orders.
    pub fn sweep_expired(
        &self,
        store: &mut dyn Store,
        markets: &impl MarketSource,
        bank: &impl BalanceOps,
        events: &mut Vec<Event>,
        block_time: u64,
    ) -> Result<usize, Error> {
        let expired: Vec<Order> = self
            .list(store)
            .into_iter()
            .filter(|order| order.is_expired(block_time))
            .collect();

        for order in &expired {
            let market = markets.market_extended(store, order.market_id)?;
            if order.locked > 0 {
                bank.transfer(
                    store,
                    &ESCROW_ADDRESS,
                    &order.owner,
                    lock_denom(&market, order.direction),
                    order.locked,
                )?;
            }
            store.delete(&order_key(order.id));

            events.push(
                Event::new("order_expired")
                    .attr("order_id", order.id)
                    .attr("owner", order.owner),
            );
        }

        if !expired.is_empty() {
            info!("expired {} orders at block time {}", expired.len(), block_time);
        }
        Ok(expired.len())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Fetch a live order by id.
    pub fn get(&self, store: &dyn Store, order_id: u64) -> Result<Order, Error> {
        store
            .get(&order_key(order_id))
            .ok_or(Error::UnknownOrder(order_id))
            .and_then(|bytes| from_bytes(&bytes))
    }

    /// All live orders in ascending id order.
    pub fn list(&self, store: &dyn Store) -> Vec<Order> {
        store
            .iter_prefix(ORDER_PREFIX)
            .into_iter()
            .filter_map(|(_, bytes)| from_bytes(&bytes).ok())
            .collect()
    }

    /// Live orders owned by `owner`, ascending id order.
    pub fn list_by_owner(&self, store: &dyn Store, owner: &Address) -> Vec<Order> {
        self.list(store)
            .into_iter()
            .filter(|order| order.owner == *owner)
            .collect()
    }

    /// Live orders on `market_id`, ascending id order.
    pub fn list_by_market(&self, store: &dyn Store, market_id: MarketId) -> Vec<Order> {
        self.list(store)
            .into_iter()
            .filter(|order| order.market_id == market_id)
            .collect()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn next_id(&self, store: &dyn Store) -> u64 {
        store
            .get(NEXT_ID_KEY)
            .and_then(|bytes| from_bytes(&bytes).ok())
            .unwrap_or(0)
    }

    /// Rebuild the resting book for one market from the store.
    fn build_book(
        &self,
        store: &dyn Store,
        market_id: MarketId,
        exclude: Option<u64>,
    ) -> OrderBook {
        OrderBook::from_orders(
            self.list(store)
                .into_iter()
                .filter(|order| order.market_id == market_id && Some(order.id) != exclude),
        )
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
