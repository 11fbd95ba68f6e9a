//! VM bridge keeper: request marshalling and write-set reconciliation.
//!
//! ## Keep / Discard / Crash
//!
//! A well-formed VM response is one of two deterministic outcomes:
//!
//! - **Keep** - the execution ran deterministically (including an in-VM
//!   assertion failure). Its write-set is applied atomically, its events
//!   are appended in order, gas is charged.
//! - **Discard** - the VM rejected the transaction without deterministic
//!   execution. Nothing is applied.
//!
//! Anything else - the transport died, the response did not parse, the
//! retry budget ran out - is indistinguishable from a local outage, and
//! different validators may observe different outages for the same logical
//! call. Applying a guess would fork the chain, so the keeper escalates
//! [`Error::ConsensusFailure`]; the node halts on it rather than continue.

use log::{debug, error};

use crate::error::Error;
use crate::store::{Store, StoreScope};
use crate::types::{Address, Event};
use crate::vm::client::VmClient;
use crate::vm::types::{
    validate_args, AccessPath, ExecStatus, ScriptArg, VmRequest, VmResponse, WriteOp,
};

/// Deterministic outcome of a VM-backed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmOutcome {
    pub status: ExecStatus,
    pub gas_used: u64,
    pub message: Option<String>,
}

/// VM bridge keeper.
#[derive(Debug)]
pub struct VmKeeper<C: VmClient> {
    client: C,
}

impl<C: VmClient> VmKeeper<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// The injected transport client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Publish a Move module under the signer's account.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidAddress`] - empty signer
    /// * [`Error::EmptyContract`] - empty bytecode, rejected before any RPC
    /// * [`Error::ConsensusFailure`] - transport-level VM failure
    pub fn deploy_module(
        &self,
        store: &mut dyn Store,
        events: &mut Vec<Event>,
        signer: Address,
        code: Vec<u8>,
    ) -> Result<VmOutcome, Error> {
        if signer.is_empty() {
            return Err(Error::InvalidAddress("empty deployer address".to_string()));
        }
        if code.is_empty() {
            return Err(Error::EmptyContract);
        }

        self.dispatch(store, events, VmRequest::publish_module(signer, code))
    }

    /// Execute a Move script with typed arguments.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidAddress`] / [`Error::EmptyContract`] - as for deploy
    /// * [`Error::WrongArgValue`] - an argument with an empty value
    /// * [`Error::ConsensusFailure`] - transport-level VM failure
    pub fn execute_script(
        &self,
        store: &mut dyn Store,
        events: &mut Vec<Event>,
        signer: Address,
        code: Vec<u8>,
        args: Vec<ScriptArg>,
    ) -> Result<VmOutcome, Error> {
        if signer.is_empty() {
            return Err(Error::InvalidAddress("empty signer address".to_string()));
        }
        if code.is_empty() {
            return Err(Error::EmptyContract);
        }
        validate_args(&args)?;

        self.dispatch(store, events, VmRequest::execute_script(signer, code, args))
    }

    /// Read a raw value from VM storage (query surface).
    pub fn get_value(&self, store: &dyn Store, access_path: &AccessPath) -> Option<Vec<u8>> {
        store.get(&access_path.storage_key())
    }

    /// Ship the request and reconcile the response into the store.
    fn dispatch(
        &self,
        store: &mut dyn Store,
        events: &mut Vec<Event>,
        request: VmRequest,
    ) -> Result<VmOutcome, Error> {
        let response = self.client.execute(&request).map_err(|transport_err| {
            error!(
                "CONSENSUS FAILURE: VM did not produce a deterministic result: {}",
                transport_err
            );
            Error::ConsensusFailure(transport_err.to_string())
        })?;

        match response.status {
            ExecStatus::Discard => {
                debug!(
                    "VM discarded transaction: {}",
                    response.message.as_deref().unwrap_or("no reason given")
                );
                Ok(VmOutcome {
                    status: ExecStatus::Discard,
                    gas_used: response.gas_used,
                    message: response.message,
                })
            }
            ExecStatus::Keep => {
                apply_write_set(store, &response);
                events.extend(response.events);
                Ok(VmOutcome {
                    status: ExecStatus::Keep,
                    gas_used: response.gas_used,
                    message: response.message,
                })
            }
        }
    }
}

/// Apply every write-set entry exactly once, as one batch.
///
/// Entries are buffered in a scope and committed together; there is no
/// path on which only part of a write-set lands.
fn apply_write_set(store: &mut dyn Store, response: &VmResponse) {
    let mut scope = StoreScope::new(store);
    for entry in &response.write_set {
        let key = entry.access_path.storage_key();
        match &entry.op {
            WriteOp::Value(value) => scope.set(&key, value.clone()),
            WriteOp::Delete => scope.delete(&key),
        }
    }
    scope.commit();
}

// ============================================================================
// Unit Tests
// ============================================================================
