//! Application node: message router and block lifecycle.
//!
//! ## Transaction Processing
//!
//! Transactions are processed single-threaded, strictly sequential, one
//! fully before the next - a deterministic-replay requirement, not a
//! simplification. Each transaction runs in a [`StoreScope`] over the
//! node's store: commit on success, drop on error, so a failed message
//! leaves committed state byte-identical.
//!
//! ## Message Routing
//!
//! [`Msg`] is a closed tagged union dispatched through an exhaustive
//! match. Adding a message kind is a compile-checked enumeration change.
//!
//! ## Halting
//!
//! A [`Error::ConsensusFailure`] out of the VM bridge is fatal: the node
//! logs a distinct `CONSENSUS FAILURE` marker and panics instead of
//! committing anything from the transaction. A restarted node re-executes
//! the same transaction from the same committed state and re-detects the
//! same condition deterministically.

use log::{debug, error, info};

use crate::bank::BalanceOps;
use crate::config::VmConfig;
use crate::currencies::{CurrencyReader, CurrencyRegistry};
use crate::error::Error;
use crate::markets::{MarketDirectory, MarketRegistry};
use crate::orders::OrdersKeeper;
use crate::store::{state_root, Store, StoreScope};
use crate::types::{
    Address, Currency, CurrencyParams, Direction, Event, Market, MarketId, Order, OrderStatus,
};
use crate::vm::types::{validate_args, AccessPath, ScriptArg};
use crate::vm::{VmClient, VmKeeper, VmOutcome};

// ============================================================================
// Messages
// ============================================================================

/// The closed set of transaction messages the node routes.
#[derive(Debug, Clone)]
pub enum Msg {
    /// Register a currency (governance-style, once per denom).
    CreateCurrency {
        denom: String,
        params: CurrencyParams,
    },

    /// Mint supply and credit it to `payee`.
    IssueCurrency {
        denom: String,
        amount: u128,
        payee: Address,
    },

    /// Burn supply debited from `payer`.
    WithdrawCurrency {
        denom: String,
        amount: u128,
        payer: Address,
    },

    /// Register a directional base/quote market.
    CreateMarket {
        base_denom: String,
        quote_denom: String,
    },

    /// Place a limit order.
    PlaceOrder {
        owner: Address,
        market_id: MarketId,
        direction: Direction,
        price: u128,
        quantity: u128,
        ttl_secs: u64,
    },

    /// Cancel a live order.
    CancelOrder { sender: Address, order_id: u64 },

    /// Publish a Move module.
    DeployModule { signer: Address, code: Vec<u8> },

    /// Execute a Move script.
    ExecuteScript {
        signer: Address,
        code: Vec<u8>,
        args: Vec<ScriptArg>,
    },
}

/// Typed per-message response data.
#[derive(Debug, Clone)]
pub enum TxResponse {
    CurrencyCreated { denom: String },
    SupplyChanged { denom: String, supply: u128 },
    MarketCreated(Market),
    OrderPlaced { order_id: u64, status: OrderStatus },
    OrderCancelled { order_id: u64 },
    Vm(VmOutcome),
}

/// Result of a delivered transaction.
#[derive(Debug)]
pub struct TxOutcome {
    pub response: TxResponse,
    pub events: Vec<Event>,
}

// ============================================================================
// Block receipt
// ============================================================================

/// Per-block execution summary.
///
/// The state root is the determinism witness: two validators that executed
/// the same blocks hold identical roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReceipt {
    /// Block height.
    pub height: u64,

    /// Block time (unix seconds).
    pub block_time: u64,

    /// Transactions delivered in this block.
    pub txs_processed: u64,

    /// Fills executed in this block.
    pub fills_executed: u64,

    /// Orders expired by the end-of-block sweep.
    pub orders_expired: u64,

    /// SHA-256 commitment over the full store after the block.
    pub state_root: [u8; 32],
}

impl BlockReceipt {
    /// State root as a hex string.
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root)
    }
}

// ============================================================================
// Node
// ============================================================================

/// The application node.
///
/// Owns the store and the module keepers; every keeper receives the store
/// (or a transaction scope over it) explicitly per call.
pub struct Node<S: Store, B: BalanceOps, V: VmClient> {
    store: S,
    bank: B,
    currencies: CurrencyRegistry,
    markets: MarketRegistry,
    orders: OrdersKeeper,
    vm: VmKeeper<V>,

    block_height: u64,
    block_time: u64,
    txs_in_block: u64,
    fills_in_block: u64,
}

impl<S: Store, B: BalanceOps, V: VmClient> Node<S, B, V> {
    /// Assemble a node from its injected dependencies.
    pub fn new(store: S, bank: B, vm_client: V) -> Self {
        Self {
            store,
            bank,
            currencies: CurrencyRegistry::new(),
            markets: MarketRegistry::new(),
            orders: OrdersKeeper::new(),
            vm: VmKeeper::new(vm_client),
            block_height: 0,
            block_time: 0,
            txs_in_block: 0,
            fills_in_block: 0,
        }
    }

    /// Begin a block: set height and block time for subsequent messages.
    pub fn begin_block(&mut self, height: u64, block_time: u64) {
        self.block_height = height;
        self.block_time = block_time;
        self.txs_in_block = 0;
        self.fills_in_block = 0;
        debug!("begin block {} at time {}", height, block_time);
    }

    /// Deliver one transaction.
    ///
    /// Runs the message in a scope over the store; the scope commits only
    /// on success. A [`Error::ConsensusFailure`] halts the process.
    pub fn deliver_tx(&mut self, msg: Msg) -> Result<TxOutcome, Error> {
        let mut events = Vec::new();
        let mut scope = StoreScope::new(&mut self.store);

        let result = route(
            &mut scope,
            &mut events,
            &self.currencies,
            &self.markets,
            &self.orders,
            &self.vm,
            &self.bank,
            self.block_time,
            msg,
        );

        match result {
            Ok(response) => {
                scope.commit();
                self.txs_in_block += 1;
                self.fills_in_block += events.iter().filter(|e| e.kind == "fill").count() as u64;
                Ok(TxOutcome { response, events })
            }
            Err(err) if err.is_fatal() => {
                // The scope is dropped: nothing from this transaction is
                // committed before the halt.
                drop(scope);
                halt(&err)
            }
            Err(err) => {
                debug!("tx rejected: {}", err);
                Err(err)
            }
        }
    }

    /// Validate a transaction speculatively, committing nothing.
    ///
    /// VM-backed messages are checked statically only - the VM is not
    /// contacted outside delivery. Everything else runs in a scope that is
    /// always dropped.
    pub fn check_tx(&mut self, msg: Msg) -> Result<(), Error> {
        match &msg {
            Msg::DeployModule { signer, code } => {
                if signer.is_empty() {
                    return Err(Error::InvalidAddress("empty deployer address".to_string()));
                }
                if code.is_empty() {
                    return Err(Error::EmptyContract);
                }
                Ok(())
            }
            Msg::ExecuteScript { signer, code, args } => {
                if signer.is_empty() {
                    return Err(Error::InvalidAddress("empty signer address".to_string()));
                }
                if code.is_empty() {
                    return Err(Error::EmptyContract);
                }
                validate_args(args)
            }
            _ => {
                let mut events = Vec::new();
                let mut scope = StoreScope::new(&mut self.store);
                route(
                    &mut scope,
                    &mut events,
                    &self.currencies,
                    &self.markets,
                    &self.orders,
                    &self.vm,
                    &self.bank,
                    self.block_time,
                    msg,
                )
                .map(|_| ())
                // Scope dropped here: speculative writes discarded wholesale.
            }
        }
    }

    /// End the block: run the TTL sweep and emit the block receipt.
    pub fn end_block(&mut self) -> Result<(BlockReceipt, Vec<Event>), Error> {
        let mut events = Vec::new();
        let expired = {
            let mut scope = StoreScope::new(&mut self.store);
            let directory = MarketDirectory {
                markets: &self.markets,
                currencies: &self.currencies,
            };
            let expired = self.orders.sweep_expired(
                &mut scope,
                &directory,
                &self.bank,
                &mut events,
                self.block_time,
            )?;
            scope.commit();
            expired
        };

        let receipt = BlockReceipt {
            height: self.block_height,
            block_time: self.block_time,
            txs_processed: self.txs_in_block,
            fills_executed: self.fills_in_block,
            orders_expired: expired as u64,
            state_root: state_root(&self.store),
        };

        info!(
            "block {} done: {} txs, {} fills, {} expired, root {}",
            receipt.height,
            receipt.txs_processed,
            receipt.fills_executed,
            receipt.orders_expired,
            receipt.state_root_hex()
        );
        Ok((receipt, events))
    }

    // ========================================================================
    // Queries (read-only, no side effects)
    // ========================================================================

    /// SHA-256 commitment over the committed store.
    pub fn state_root(&self) -> [u8; 32] {
        state_root(&self.store)
    }

    pub fn currency(&self, denom: &str) -> Result<Currency, Error> {
        self.currencies.currency(&self.store, denom)
    }

    pub fn list_currencies(&self) -> Vec<Currency> {
        self.currencies.list(&self.store)
    }

    pub fn market(&self, id: MarketId) -> Result<Market, Error> {
        self.markets.get(&self.store, id)
    }

    pub fn list_markets(&self) -> Vec<Market> {
        self.markets.list(&self.store)
    }

    pub fn order(&self, id: u64) -> Result<Order, Error> {
        self.orders.get(&self.store, id)
    }

    pub fn list_orders(&self) -> Vec<Order> {
        self.orders.list(&self.store)
    }

    pub fn list_orders_by_owner(&self, owner: &Address) -> Vec<Order> {
        self.orders.list_by_owner(&self.store, owner)
    }

    pub fn balance_of(&self, address: &Address, denom: &str) -> u128 {
        self.bank.balance_of(&self.store, address, denom)
    }

    pub fn vm_value(&self, access_path: &AccessPath) -> Option<Vec<u8>> {
        self.vm.get_value(&self.store, access_path)
    }

    /// The injected VM transport client.
    pub fn vm_client(&self) -> &V {
        self.vm.client()
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn block_time(&self) -> u64 {
        self.block_time
    }
}

/// Build a node over in-memory infrastructure with the socket VM client.
///
/// Convenience for the binary; tests assemble their own with [`StubVm`]
/// (see `Node::new`).
///
/// [`StubVm`]: crate::vm::StubVm
pub fn new_dvm_node(
    config: VmConfig,
) -> Node<crate::store::MemStore, crate::bank::StoreBank, crate::vm::DvmClient> {
    Node::new(
        crate::store::MemStore::new(),
        crate::bank::StoreBank::new(),
        crate::vm::DvmClient::new(config),
    )
}

// ============================================================================
// Routing
// ============================================================================

/// Exhaustive message dispatch. Every arm returns its typed response;
/// events accumulate in emission order.
#[allow(clippy::too_many_arguments)]
fn route<B: BalanceOps, V: VmClient>(
    store: &mut dyn Store,
    events: &mut Vec<Event>,
    currencies: &CurrencyRegistry,
    markets: &MarketRegistry,
    orders: &OrdersKeeper,
    vm: &VmKeeper<V>,
    bank: &B,
    block_time: u64,
    msg: Msg,
) -> Result<TxResponse, Error> {
    match msg {
        Msg::CreateCurrency { denom, params } => {
            let currency = currencies.create(store, &denom, params)?;
            events.push(
                Event::new("currency_created")
                    .attr("denom", &currency.denom)
                    .attr("decimals", currency.decimals),
            );
            Ok(TxResponse::CurrencyCreated {
                denom: currency.denom,
            })
        }

        Msg::IssueCurrency {
            denom,
            amount,
            payee,
        } => {
            currencies.increase_supply(store, &denom, amount)?;
            bank.deposit(store, &payee, &denom, amount)?;
            let supply = currencies.currency(store, &denom)?.supply;
            events.push(
                Event::new("currency_issued")
                    .attr("denom", &denom)
                    .attr("amount", amount)
                    .attr("payee", payee),
            );
            Ok(TxResponse::SupplyChanged { denom, supply })
        }

        Msg::WithdrawCurrency {
            denom,
            amount,
            payer,
        } => {
            bank.withdraw(store, &payer, &denom, amount)?;
            currencies.decrease_supply(store, &denom, amount)?;
            let supply = currencies.currency(store, &denom)?.supply;
            events.push(
                Event::new("currency_withdrawn")
                    .attr("denom", &denom)
                    .attr("amount", amount)
                    .attr("payer", payer),
            );
            Ok(TxResponse::SupplyChanged { denom, supply })
        }

        Msg::CreateMarket {
            base_denom,
            quote_denom,
        } => {
            let market = markets.create(store, currencies, &base_denom, &quote_denom)?;
            events.push(
                Event::new("market_created")
                    .attr("market_id", market.id)
                    .attr("base_denom", &market.base_denom)
                    .attr("quote_denom", &market.quote_denom),
            );
            Ok(TxResponse::MarketCreated(market))
        }

        Msg::PlaceOrder {
            owner,
            market_id,
            direction,
            price,
            quantity,
            ttl_secs,
        } => {
            let directory = MarketDirectory {
                markets,
                currencies,
            };
            let outcome = orders.place_order(
                store, &directory, bank, events, owner, market_id, direction, price, quantity,
                ttl_secs, block_time,
            )?;
            Ok(TxResponse::OrderPlaced {
                order_id: outcome.order_id,
                status: outcome.status,
            })
        }

        Msg::CancelOrder { sender, order_id } => {
            let directory = MarketDirectory {
                markets,
                currencies,
            };
            orders.cancel_order(store, &directory, bank, events, sender, order_id)?;
            Ok(TxResponse::OrderCancelled { order_id })
        }

        Msg::DeployModule { signer, code } => {
            let outcome = vm.deploy_module(store, events, signer, code)?;
            Ok(TxResponse::Vm(outcome))
        }

        Msg::ExecuteScript { signer, code, args } => {
            let outcome = vm.execute_script(store, events, signer, code, args)?;
            Ok(TxResponse::Vm(outcome))
        }
    }
}

/// Terminate the node process on a fatal error.
///
/// The distinct log marker is load-bearing: operators grep for it, and the
/// policy it announces (halt instead of guessing) is what keeps validators
/// from forking.
fn halt(err: &Error) -> ! {
    error!("CONSENSUS FAILURE: {}. Halting block processing.", err);
    panic!("consensus failure: {}", err);
}

// ============================================================================
// Unit Tests
// ============================================================================
