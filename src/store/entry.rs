//! Cache Entry Module
//!
//! One decoded value in the memory cache, carrying its absolute expiry.
//! Expiry is checked lazily at read time; there is no background sweep.

use serde_json::Value;

use crate::expiry::{current_timestamp_ms, is_expired};

// == Cache Entry ==
/// A decoded value with its expiration timestamp (Unix milliseconds).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    /// Creates an entry expiring at the given absolute timestamp.
    pub fn new(value: Value, expires_at: u64) -> Self {
        Self { value, expires_at }
    }

    /// Checks the entry against the current time.
    pub fn is_expired(&self) -> bool {
        is_expired(self.expires_at, current_timestamp_ms())
    }
}

// == Falsy Values ==
/// The falsy family the store refuses to persist: null, false, numeric
/// zero, and the empty string. Arrays and objects are never falsy.
pub(crate) fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_not_expired_before_deadline() {
        let entry = CacheEntry::new(json!("v"), current_timestamp_ms() + 60_000);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expired_after_deadline() {
        let entry = CacheEntry::new(json!("v"), current_timestamp_ms() - 1);
        assert!(entry.is_expired());
    }

    #[test]
    fn test_falsy_family() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!(0.0)));
        assert!(is_falsy(&json!("")));
    }

    #[test]
    fn test_truthy_values() {
        assert!(!is_falsy(&json!(true)));
        assert!(!is_falsy(&json!(1)));
        assert!(!is_falsy(&json!(-0.5)));
        assert!(!is_falsy(&json!("0")));
        assert!(!is_falsy(&json!([])));
        assert!(!is_falsy(&json!({})));
    }
}
