//! Deterministic order matching and settlement.
//!
//! ## Matching Rules
//!
//! - A bid matches an ask when `bid.price >= ask.price`; candidates are
//!   taken best price first, FIFO within a price level (price-time
//!   priority).
//! - Execution price is the resting (maker) order's price, never the
//!   aggressor's - the taker is not rewarded with a better price than
//!   displayed.
//! - Matched quantity is `min(taker remaining, maker remaining)`; an order
//!   reaching zero is removed, otherwise it stays at its original queue
//!   position (original timestamp, never re-queued).
//!
//! ## Settlement
//!
//! Both legs of a fill pay out of the orders escrow: quote to the seller,
//! base to the buyer, plus the maker's locked remainder when the fill
//! completes it. All of it happens inside one [`StoreScope`]; the scope
//! commits only after every transfer and record update succeeded, so a
//! failed fill leaves both orders and every balance exactly as they were.
//! A failed fill also ends the matching run - the taker's remainder rests
//! on the book.
//!
//! ## Determinism
//!
//! The loop reads the book (rebuilt in ascending order-id order), integer
//! arithmetic, and nothing else. Replaying the same order sequence on two
//! engines yields identical fills, events and store state; this is a
//! consensus requirement, not an optimization.

use log::debug;

use crate::bank::BalanceOps;
use crate::error::Error;
use crate::orders::book::OrderBook;
use crate::orders::{lock_denom, order_key, ESCROW_ADDRESS};
use crate::store::{to_bytes, Store, StoreScope};
use crate::types::{Address, Direction, Event, MarketExtended, Order};

/// A single executed fill between a resting maker and the incoming taker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub maker_order_id: u64,
    pub taker_order_id: u64,
    pub maker_owner: Address,
    pub taker_owner: Address,

    /// Execution price: always the maker's price.
    pub price: u128,

    /// Executed base quantity.
    pub quantity: u128,

    /// Quote units moved, truncated per the market's conversion.
    pub quote_amount: u128,
}

/// Result of matching one incoming order.
#[derive(Debug, Default)]
pub struct MatchResult {
    /// Fills in execution order.
    pub fills: Vec<Fill>,

    /// True when the taker's remaining quantity reached zero.
    pub fully_filled: bool,
}

/// Deterministic matching engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingEngine;

impl MatchingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Match `taker` against the book, settling each fill atomically.
    ///
    /// The taker must already be validated and its funds locked in escrow;
    /// the caller persists the taker's final state afterwards. Maker
    /// records are updated (or deleted, with their locked remainder
    /// refunded) here, inside each fill's scope.
    #[allow(clippy::too_many_arguments)]
    pub fn match_order(
        &self,
        store: &mut dyn Store,
        book: &mut OrderBook,
        taker: &mut Order,
        market: &MarketExtended,
        bank: &impl BalanceOps,
        events: &mut Vec<Event>,
        block_time: u64,
    ) -> Result<MatchResult, Error> {
        let mut fills = Vec::new();

        while taker.remaining > 0 {
            // Best counter level, if its price is compatible.
            let Some(level) = book.best_counter_level(taker.direction) else {
                break;
            };
            let level_price = level.price;
            let compatible = match taker.direction {
                Direction::Bid => level_price <= taker.price,
                Direction::Ask => level_price >= taker.price,
            };
            if !compatible {
                break;
            }

            let maker_key = level.peek_head().expect("non-empty level has a head");
            let maker = book
                .get(maker_key)
                .expect("level head present in slab")
                .clone();

            let fill_qty = taker.remaining.min(maker.remaining);
            let exec_price = maker.price;

            // Quote leg, truncated. A fill so small it converts to zero
            // quote units cannot settle; leave both orders resting.
            let quote_amount = match market.base_to_quote_quantity(exec_price, fill_qty) {
                Ok(amount) => amount,
                Err(err) => {
                    debug!("match stopped at order {}: {}", maker.id, err);
                    break;
                }
            };

            let (buyer_owner, seller_owner) = match taker.direction {
                Direction::Bid => (taker.owner, maker.owner),
                Direction::Ask => (maker.owner, taker.owner),
            };

            // Settle the fill in its own scope: escrow pays both legs and
            // the maker's record is rewritten. All-or-nothing.
            let mut scope = StoreScope::new(&mut *store);
            let settled = settle_fill(
                &mut scope,
                bank,
                market,
                taker,
                &maker,
                buyer_owner,
                seller_owner,
                fill_qty,
                quote_amount,
                block_time,
            );
            let (maker_locked, taker_locked) = match settled {
                Ok(locked) => locked,
                Err(err) => {
                    // Scope dropped: both orders and all balances restored.
                    debug!(
                        "fill {}<-{} aborted, orders restored: {}",
                        maker.id, taker.id, err
                    );
                    break;
                }
            };
            scope.commit();

            // Store state is final; mirror it into the in-memory book and
            // the taker.
            taker.fill(fill_qty);
            taker.locked = taker_locked;
            taker.updated_at = block_time;

            let maker_filled = {
                let node = book
                    .get_node_mut(maker_key)
                    .expect("level head present in slab");
                node.fill(fill_qty);
                node.order.locked = maker_locked;
                node.order.updated_at = block_time;
                node.is_filled()
            };
            book.reduce_level_quantity(maker.direction, exec_price, fill_qty);
            if maker_filled {
                book.remove(maker_key);
            }

            events.push(
                Event::new("fill")
                    .attr("market_id", market.id)
                    .attr("maker_order_id", maker.id)
                    .attr("taker_order_id", taker.id)
                    .attr("price", exec_price)
                    .attr("quantity", fill_qty)
                    .attr("quote_amount", quote_amount),
            );
            if maker_filled {
                events.push(
                    Event::new("order_filled")
                        .attr("order_id", maker.id)
                        .attr("owner", maker.owner),
                );
            }

            fills.push(Fill {
                maker_order_id: maker.id,
                taker_order_id: taker.id,
                maker_owner: maker.owner,
                taker_owner: taker.owner,
                price: exec_price,
                quantity: fill_qty,
                quote_amount,
            });
        }

        Ok(MatchResult {
            fully_filled: taker.remaining == 0,
            fills,
        })
    }
}

/// Run every store effect of one fill inside `scope`.
///
/// Returns the post-fill locked remainders `(maker_locked, taker_locked)`.
/// Any error leaves the scope uncommitted.
#[allow(clippy::too_many_arguments)]
fn settle_fill(
    scope: &mut StoreScope<'_>,
    bank: &impl BalanceOps,
    market: &MarketExtended,
    taker: &Order,
    maker: &Order,
    buyer_owner: Address,
    seller_owner: Address,
    fill_qty: u128,
    quote_amount: u128,
    block_time: u64,
) -> Result<(u128, u128), Error> {
    // Quote to the seller, base to the buyer.
    bank.transfer(
        scope,
        &ESCROW_ADDRESS,
        &seller_owner,
        market.quote_denom(),
        quote_amount,
    )?;
    bank.transfer(
        scope,
        &ESCROW_ADDRESS,
        &buyer_owner,
        market.base_denom(),
        fill_qty,
    )?;

    // Escrow released by this fill: the buyer side releases quote, the
    // seller side releases base.
    let release = |order: &Order| match order.direction {
        Direction::Bid => quote_amount,
        Direction::Ask => fill_qty,
    };
    let maker_locked = maker
        .locked
        .checked_sub(release(maker))
        .ok_or(Error::Overflow("maker escrow release"))?;
    let taker_locked = taker
        .locked
        .checked_sub(release(taker))
        .ok_or(Error::Overflow("taker escrow release"))?;

    // Rewrite the maker's record; a completed maker leaves the store and
    // gets its truncation dust back.
    let mut maker_after = maker.clone();
    maker_after.fill(fill_qty);
    maker_after.locked = maker_locked;
    maker_after.updated_at = block_time;

    if maker_after.is_filled() {
        if maker_locked > 0 {
            bank.transfer(
                scope,
                &ESCROW_ADDRESS,
                &maker.owner,
                lock_denom(market, maker.direction),
                maker_locked,
            )?;
        }
        scope.delete(&order_key(maker.id));
        Ok((0, taker_locked))
    } else {
        scope.set(&order_key(maker.id), to_bytes(&maker_after));
        Ok((maker_locked, taker_locked))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
