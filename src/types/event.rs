//! Transaction events.
//!
//! Events are the observable trace of a transaction: the matching engine
//! emits post/fill/cancel/expire records, the VM bridge appends whatever the
//! VM returned. Order matters - events are appended in emission order and
//! never reordered or deduplicated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single key/value event attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// An ordered, typed event record.
///
/// ## Example
///
/// ```
/// use dexnode::types::Event;
///
/// let event = Event::new("order_posted")
///     .attr("order_id", "7")
///     .attr("market_id", "0");
///
/// assert_eq!(event.kind, "order_posted");
/// assert_eq!(event.get("order_id"), Some("7"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event type tag (e.g. "order_posted", "order_filled").
    pub kind: String,

    /// Attributes in emission order.
    pub attributes: Vec<Attribute>,
}

impl Event {
    /// Start an event with no attributes.
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute, builder style.
    pub fn attr(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.attributes.push(Attribute {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// First attribute value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = Event::new("fill")
            .attr("maker", 1)
            .attr("taker", 2)
            .attr("quantity", 100u128);

        assert_eq!(event.kind, "fill");
        assert_eq!(event.attributes.len(), 3);
        assert_eq!(event.get("maker"), Some("1"));
        assert_eq!(event.get("quantity"), Some("100"));
        assert_eq!(event.get("missing"), None);
    }

    #[test]
    fn test_event_attribute_order_preserved() {
        let event = Event::new("t").attr("b", 1).attr("a", 2).attr("b", 3);

        let keys: Vec<_> = event.attributes.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "b"]);
        // get() returns the first occurrence.
        assert_eq!(event.get("b"), Some("1"));
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let event = Event::new("order_expired").attr("order_id", 9);
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
