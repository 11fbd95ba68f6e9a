//! Move VM bridge module.
//!
//! ## Components
//!
//! - [`types`]: wire types - requests, responses, write-sets, events
//! - [`client`]: the [`VmClient`] seam and the socket transport
//! - [`keeper`]: request validation and write-set reconciliation
//! - [`stub`]: programmable in-process VM for tests and local runs
//!
//! ## Failure Policy
//!
//! A `Keep`/`Discard` response is a deterministic result and is reconciled
//! locally. A transport failure is not: the keeper turns it into
//! [`crate::error::Error::ConsensusFailure`] and the node halts. Retrying
//! then giving up gracefully is the one wrong answer here - validators that
//! "gracefully" guessed differently would fork the chain.

pub mod client;
pub mod keeper;
pub mod stub;
pub mod types;

pub use client::{DvmClient, VmClient, VmError};
pub use keeper::{VmKeeper, VmOutcome};
pub use stub::StubVm;
pub use types::{
    AccessPath, ArgKind, ExecStatus, RequestKind, ScriptArg, VmRequest, VmResponse, WriteOp,
    WriteSetEntry, STDLIB_ADDRESS,
};
