//! Wire types for the external Move VM.
//!
//! ## Protocol Shape
//!
//! A request carries the signer (fixed-length binary), the compiled
//! bytecode, and typed arguments. A response carries an execution status,
//! gas consumed, an ordered write-set and ordered events:
//!
//! - **Keep**: the execution produced a deterministic result (success or an
//!   in-VM assertion failure); its write-set and events are applied.
//! - **Discard**: the VM rejected the transaction before deterministic
//!   execution (malformed bytecode, bad signer); nothing is applied.
//!
//! Anything else - no response, a malformed frame, a dead socket - is not a
//! status at all and is escalated by the keeper as a consensus failure.
//!
//! Binary fields travel hex-encoded inside JSON frames; see
//! [`crate::vm::client`] for the framing.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Address, Event};

/// Address owning the standard library and currency info resources.
pub const STDLIB_ADDRESS: Address = Address([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);

/// Store namespace holding VM-visible resources.
const VM_DATA_PREFIX: &[u8] = b"vm:data:";

// ============================================================================
// Access paths and write sets
// ============================================================================

/// Location of a resource inside VM storage: owner address plus a
/// resource-specific path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPath {
    pub address: Address,

    #[serde(with = "crate::types::hexbytes")]
    pub path: Vec<u8>,
}

impl AccessPath {
    pub fn new(address: Address, path: Vec<u8>) -> Self {
        Self { address, path }
    }

    /// Deterministic store key for this path.
    ///
    /// Keys are `vm:data:<address><path>`; both components are fixed or
    /// caller-owned bytes, so equal paths always map to equal keys.
    pub fn storage_key(&self) -> Vec<u8> {
        let mut key = VM_DATA_PREFIX.to_vec();
        key.extend_from_slice(self.address.as_bytes());
        key.extend_from_slice(&self.path);
        key
    }
}

/// A single write-set operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOp {
    /// Upsert the value at the access path.
    Value(#[serde(with = "crate::types::hexbytes")] Vec<u8>),
    /// Remove the access path.
    Delete,
}

/// One entry of an execution's write-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSetEntry {
    pub access_path: AccessPath,
    pub op: WriteOp,
}

// ============================================================================
// Script arguments
// ============================================================================

/// Recognized script argument types, mirroring the VM's type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Vector,
}

impl ArgKind {
    /// Decode a raw wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ArgKind::Bool),
            1 => Some(ArgKind::U8),
            2 => Some(ArgKind::U64),
            3 => Some(ArgKind::U128),
            4 => Some(ArgKind::Address),
            5 => Some(ArgKind::Vector),
            _ => None,
        }
    }

    /// Raw wire tag.
    pub fn to_tag(self) -> u8 {
        match self {
            ArgKind::Bool => 0,
            ArgKind::U8 => 1,
            ArgKind::U64 => 2,
            ArgKind::U128 => 3,
            ArgKind::Address => 4,
            ArgKind::Vector => 5,
        }
    }
}

/// A typed script argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptArg {
    pub kind: ArgKind,

    #[serde(with = "crate::types::hexbytes")]
    pub value: Vec<u8>,
}

impl ScriptArg {
    pub fn new(kind: ArgKind, value: Vec<u8>) -> Self {
        Self { kind, value }
    }

    /// Build an argument from a raw type tag, rejecting unknown tags.
    pub fn from_tag(tag: u8, value: Vec<u8>) -> Result<Self, Error> {
        let kind = ArgKind::from_tag(tag).ok_or_else(|| Error::WrongArgType(tag.to_string()))?;
        Ok(Self { kind, value })
    }

    /// Convenience constructor for u64 arguments (little-endian).
    pub fn u64(value: u64) -> Self {
        Self::new(ArgKind::U64, value.to_le_bytes().to_vec())
    }

    /// Convenience constructor for address arguments.
    pub fn address(address: &Address) -> Self {
        Self::new(ArgKind::Address, address.as_bytes().to_vec())
    }
}

/// Validate a script's argument list: every value must be non-empty.
///
/// Type tags are validated at construction ([`ScriptArg::from_tag`]); this
/// catches empty payloads before the VM is contacted.
pub fn validate_args(args: &[ScriptArg]) -> Result<(), Error> {
    for (index, arg) in args.iter().enumerate() {
        if arg.value.is_empty() {
            return Err(Error::WrongArgValue(index));
        }
    }
    Ok(())
}

// ============================================================================
// Request / response
// ============================================================================

/// Request kind: publish a module or execute a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    PublishModule,
    ExecuteScript,
}

/// A contract call shipped to the VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRequest {
    pub kind: RequestKind,
    pub signer: Address,

    #[serde(with = "crate::types::hexbytes")]
    pub code: Vec<u8>,

    pub args: Vec<ScriptArg>,
}

impl VmRequest {
    pub fn publish_module(signer: Address, code: Vec<u8>) -> Self {
        Self {
            kind: RequestKind::PublishModule,
            signer,
            code,
            args: Vec::new(),
        }
    }

    pub fn execute_script(signer: Address, code: Vec<u8>, args: Vec<ScriptArg>) -> Self {
        Self {
            kind: RequestKind::ExecuteScript,
            signer,
            code,
            args,
        }
    }
}

/// Execution outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecStatus {
    Keep,
    Discard,
}

/// A well-formed VM response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmResponse {
    pub status: ExecStatus,
    pub gas_used: u64,

    /// Ordered writes; applied exactly once, atomically, on `Keep`.
    pub write_set: Vec<WriteSetEntry>,

    /// Ordered events; appended as-is on `Keep`.
    pub events: Vec<Event>,

    /// Optional human-readable status detail (e.g. discard reason).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VmResponse {
    /// An empty `Discard` response with a reason.
    pub fn discard(message: &str) -> Self {
        Self {
            status: ExecStatus::Discard,
            gas_used: 0,
            write_set: Vec::new(),
            events: Vec::new(),
            message: Some(message.to_string()),
        }
    }

    /// A `Keep` response carrying writes and events.
    pub fn keep(gas_used: u64, write_set: Vec<WriteSetEntry>, events: Vec<Event>) -> Self {
        Self {
            status: ExecStatus::Keep,
            gas_used,
            write_set,
            events,
            message: None,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_path_storage_key() {
        let ap = AccessPath::new(STDLIB_ADDRESS, vec![0xAA, 0xBB]);
        let key = ap.storage_key();

        assert!(key.starts_with(b"vm:data:"));
        assert!(key.ends_with(&[0xAA, 0xBB]));
        assert_eq!(key.len(), b"vm:data:".len() + 20 + 2);
    }

    #[test]
    fn test_arg_kind_tags_roundtrip() {
        for tag in 0..=5u8 {
            let kind = ArgKind::from_tag(tag).unwrap();
            assert_eq!(kind.to_tag(), tag);
        }
        assert_eq!(ArgKind::from_tag(6), None);
    }

    #[test]
    fn test_script_arg_from_tag_rejects_unknown() {
        let err = ScriptArg::from_tag(42, vec![1]).unwrap_err();
        assert!(matches!(err, Error::WrongArgType(_)));
    }

    #[test]
    fn test_validate_args() {
        let args = vec![ScriptArg::u64(7), ScriptArg::address(&STDLIB_ADDRESS)];
        assert!(validate_args(&args).is_ok());

        let args = vec![ScriptArg::u64(7), ScriptArg::new(ArgKind::Vector, vec![])];
        assert_eq!(validate_args(&args), Err(Error::WrongArgValue(1)));
    }

    #[test]
    fn test_request_response_serde_roundtrip() {
        let req = VmRequest::execute_script(
            Address::from_tag(9),
            vec![1, 2, 3],
            vec![ScriptArg::u64(100)],
        );
        let json = serde_json::to_vec(&req).unwrap();
        let back: VmRequest = serde_json::from_slice(&json).unwrap();
        assert_eq!(req, back);

        let resp = VmResponse::keep(
            21,
            vec![WriteSetEntry {
                access_path: AccessPath::new(Address::from_tag(9), vec![7]),
                op: WriteOp::Value(vec![0xFF]),
            }],
            vec![Event::new("moved").attr("amount", 5)],
        );
        let json = serde_json::to_vec(&resp).unwrap();
        let back: VmResponse = serde_json::from_slice(&json).unwrap();
        assert_eq!(resp, back);
    }

    #[test]
    fn test_write_op_wire_shape() {
        let op = WriteOp::Value(vec![0xAB]);
        assert_eq!(serde_json::to_string(&op).unwrap(), r#"{"value":"ab"}"#);

        let op = WriteOp::Delete;
        assert_eq!(serde_json::to_string(&op).unwrap(), r#""delete""#);
    }
}
