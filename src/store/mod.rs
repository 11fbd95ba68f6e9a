//! Key-value store abstraction backing every keeper.
//!
//! ## Design
//!
//! The consensus engine owns the real (Merkleized) store; this module models
//! the narrow surface the application needs:
//!
//! - [`Store`]: point reads/writes plus deterministic prefix iteration
//! - [`MemStore`]: `BTreeMap`-backed store for tests and the demo binary
//! - [`StoreScope`]: a child context holding speculative writes that either
//!   commit into the parent wholesale or are dropped wholesale
//!
//! ## Determinism
//!
//! `iter_prefix` returns entries in ascending byte order of the key. Every
//! scan a keeper performs (TTL sweeps, order-book rebuilds, state roots)
//! goes through it, so replaying the same transactions yields identical
//! iteration order on every validator.
//!
//! ## Scopes
//!
//! A [`StoreScope`] is the one atomicity mechanism in the kernel: the router
//! wraps each transaction in a scope, the VM keeper wraps a write-set
//! application in a scope, and the matcher wraps each fill's settlement in a
//! scope. Nothing below a scope ever partially commits.

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Deterministic key-value store surface used by all keepers.
pub trait Store {
    /// Point read. Returns `None` when the key is absent.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Upsert a key.
    fn set(&mut self, key: &[u8], value: Vec<u8>);

    /// Remove a key. Removing an absent key is a no-op.
    fn delete(&mut self, key: &[u8]);

    /// Existence check.
    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

// ============================================================================
// Codec helpers
// ============================================================================

/// Encode a record for storage.
///
/// Struct fields serialize in declaration order, so the encoding is
/// deterministic for the record types this crate persists.
pub fn to_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    // Serialization of plain data structs cannot fail.
    serde_json::to_vec(value).unwrap_or_default()
}

/// Decode a stored record, surfacing corruption as a typed error.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(|e| Error::Codec(e.to_string()))
}

// ============================================================================
// MemStore
// ============================================================================

/// In-memory store over a `BTreeMap`.
///
/// The ordered map gives `iter_prefix` its deterministic ordering for free.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    inner: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Store for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.inner.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.inner.remove(key);
    }

    fn has(&self, key: &[u8]) -> bool {
        self.inner.contains_key(key)
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.inner
            .range::<Vec<u8>, _>((Bound::Included(prefix.to_vec()), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// ============================================================================
// StoreScope
// ============================================================================

/// Child context over a parent store.
///
/// Reads fall through to the parent unless shadowed by a local write.
/// `commit` merges every buffered write into the parent; dropping the scope
/// discards them all. There is no partial merge.
pub struct StoreScope<'a> {
    parent: &'a mut dyn Store,
    /// Buffered writes: `Some` = upsert, `None` = delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> StoreScope<'a> {
    /// Open a scope over `parent`.
    pub fn new(parent: &'a mut dyn Store) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes (upserts and deletes).
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Merge all buffered writes into the parent, consuming the scope.
    pub fn commit(self) {
        for (key, write) in self.writes {
            match write {
                Some(value) => self.parent.set(&key, value),
                None => self.parent.delete(&key),
            }
        }
    }
}

impl Store for StoreScope<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(Some(value)) => Some(value.clone()),
            Some(None) => None,
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.insert(key.to_vec(), Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        // Merge the parent's view with the overlay; the overlay wins.
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.iter_prefix(prefix).into_iter().collect();

        for (key, write) in &self.writes {
            if !key.starts_with(prefix) {
                continue;
            }
            match write {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        merged.into_iter().collect()
    }
}

// ============================================================================
// State root
// ============================================================================

/// SHA-256 commitment over the full store contents.
///
/// Keys and values are length-prefixed before hashing so that adjacent
/// entries cannot alias. Two stores with identical contents produce
/// identical roots; this is the determinism witness used by the replay
/// tests and the per-block receipt.
pub fn state_root(store: &dyn Store) -> [u8; 32] {
    let mut hasher = Sha256::new();

    for (key, value) in store.iter_prefix(b"") {
        hasher.update((key.len() as u64).to_le_bytes());
        hasher.update(&key);
        hasher.update((value.len() as u64).to_le_bytes());
        hasher.update(&value);
    }

    let mut root = [0u8; 32];
    root.copy_from_slice(&hasher.finalize());
    root
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_store_basic() {
        let mut store = MemStore::new();
        assert!(store.is_empty());

        store.set(b"a", b"1".to_vec());
        assert_eq!(store.get(b"a"), Some(b"1".to_vec()));
        assert!(store.has(b"a"));
        assert_eq!(store.len(), 1);

        store.set(b"a", b"2".to_vec());
        assert_eq!(store.get(b"a"), Some(b"2".to_vec()));

        store.delete(b"a");
        assert!(!store.has(b"a"));
        assert!(store.get(b"a").is_none());

        // Deleting an absent key is a no-op.
        store.delete(b"a");
    }

    #[test]
    fn test_iter_prefix_ordered() {
        let mut store = MemStore::new();
        store.set(b"orders:2", b"b".to_vec());
        store.set(b"orders:1", b"a".to_vec());
        store.set(b"orders:3", b"c".to_vec());
        store.set(b"markets:1", b"x".to_vec());

        let entries = store.iter_prefix(b"orders:");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, b"orders:1".to_vec());
        assert_eq!(entries[1].0, b"orders:2".to_vec());
        assert_eq!(entries[2].0, b"orders:3".to_vec());
    }

    #[test]
    fn test_scope_commit() {
        let mut store = MemStore::new();
        store.set(b"keep", b"v".to_vec());

        let mut scope = StoreScope::new(&mut store);
        scope.set(b"new", b"1".to_vec());
        scope.delete(b"keep");
        assert_eq!(scope.pending_writes(), 2);

        // Scope sees its own writes.
        assert_eq!(scope.get(b"new"), Some(b"1".to_vec()));
        assert!(!scope.has(b"keep"));

        scope.commit();
        assert_eq!(store.get(b"new"), Some(b"1".to_vec()));
        assert!(!store.has(b"keep"));
    }

    #[test]
    fn test_scope_discard() {
        let mut store = MemStore::new();
        store.set(b"keep", b"v".to_vec());

        {
            let mut scope = StoreScope::new(&mut store);
            scope.set(b"new", b"1".to_vec());
            scope.delete(b"keep");
            // Dropped without commit.
        }

        assert!(store.has(b"keep"));
        assert!(!store.has(b"new"));
    }

    #[test]
    fn test_scope_iter_merges_overlay() {
        let mut store = MemStore::new();
        store.set(b"k:1", b"parent".to_vec());
        store.set(b"k:2", b"parent".to_vec());

        let mut scope = StoreScope::new(&mut store);
        scope.set(b"k:1", b"overlay".to_vec());
        scope.delete(b"k:2");
        scope.set(b"k:3", b"overlay".to_vec());

        let entries = scope.iter_prefix(b"k:");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (b"k:1".to_vec(), b"overlay".to_vec()));
        assert_eq!(entries[1], (b"k:3".to_vec(), b"overlay".to_vec()));
    }

    #[test]
    fn test_state_root_determinism() {
        let mut a = MemStore::new();
        let mut b = MemStore::new();

        // Same contents, different insertion order.
        a.set(b"x", b"1".to_vec());
        a.set(b"y", b"2".to_vec());
        b.set(b"y", b"2".to_vec());
        b.set(b"x", b"1".to_vec());

        assert_eq!(state_root(&a), state_root(&b));

        b.set(b"z", b"3".to_vec());
        assert_ne!(state_root(&a), state_root(&b));
    }

    #[test]
    fn test_state_root_no_aliasing() {
        // ("ab", "c") and ("a", "bc") must not hash the same.
        let mut a = MemStore::new();
        let mut b = MemStore::new();
        a.set(b"ab", b"c".to_vec());
        b.set(b"a", b"bc".to_vec());

        assert_ne!(state_root(&a), state_root(&b));
    }

    #[test]
    fn test_codec_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Rec {
            denom: String,
            amount: u128,
        }

        let rec = Rec {
            denom: "btc".into(),
            amount: u128::MAX,
        };
        let bytes = to_bytes(&rec);
        let back: Rec = from_bytes(&bytes).unwrap();
        assert_eq!(rec, back);

        let err = from_bytes::<Rec>(b"not json").unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }
}
