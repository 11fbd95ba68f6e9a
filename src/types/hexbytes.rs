//! Serde adapters encoding binary fields as hex strings.
//!
//! JSON is the store and wire codec; raw byte arrays would serialize as
//! number lists, which bloats payloads and is unreadable in logs. Every
//! binary field (bytecode, access paths, addresses) goes through these
//! adapters instead.

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize a byte slice as a lowercase hex string.
pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Deserialize a hex string into a byte vector.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    hex::decode(&s).map_err(serde::de::Error::custom)
}

/// Adapter for fixed 20-byte arrays (addresses).
pub mod fixed20 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 20], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 20], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 20 bytes"))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
