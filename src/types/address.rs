//! Account address type.
//!
//! Addresses are fixed-length binary (20 bytes), displayed and parsed as
//! hex. The VM wire format carries the same bytes, so no conversion happens
//! at the bridge boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Address length in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// A fixed-length account address.
///
/// ## Example
///
/// ```
/// use dexnode::types::Address;
///
/// let addr: Address = "0101010101010101010101010101010101010101".parse().unwrap();
/// assert_eq!(addr.to_string(), "0101010101010101010101010101010101010101");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(#[serde(with = "crate::types::hexbytes::fixed20")] pub [u8; ADDRESS_LENGTH]);

impl Address {
    /// Build an address from raw bytes.
    pub fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw byte view.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Check for the all-zero (unset) address.
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Deterministic test/module address: the tag byte repeated.
    ///
    /// Module accounts (e.g. the orders escrow) are derived this way so they
    /// can never collide with a real key-derived address by accident in
    /// tests and the demo flow.
    pub fn from_tag(tag: u8) -> Self {
        Self([tag; ADDRESS_LENGTH])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidAddress(s.to_string()))?;
        let bytes: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_roundtrip() {
        let addr = Address::from_tag(0xAB);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn test_address_rejects_bad_input() {
        assert!(matches!(
            "zz".parse::<Address>(),
            Err(Error::InvalidAddress(_))
        ));
        // Wrong length (19 bytes).
        assert!("01".repeat(19).parse::<Address>().is_err());
    }

    #[test]
    fn test_address_empty() {
        assert!(Address::default().is_empty());
        assert!(!Address::from_tag(1).is_empty());
    }

    #[test]
    fn test_address_serde() {
        let addr = Address::from_tag(0x42);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", "42".repeat(20)));

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
