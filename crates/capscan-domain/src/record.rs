//! Loosely-typed capability records as returned by the analysis service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One capability record before standardization
///
/// Field names and presence vary with whatever the upstream service returned,
/// so the record is a plain JSON object. Typed access goes through ordered
/// key-precedence lookups such as [`RawCapabilityRecord::first_str`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawCapabilityRecord(Map<String, Value>);

impl RawCapabilityRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON object
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Convert a JSON value into a record; only objects qualify
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw field access
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the field is present
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// First non-empty textual value among `keys`, in order
    ///
    /// Strings are trimmed and empty strings skipped; numbers are rendered as
    /// text. Nulls, booleans, arrays and objects never match.
    pub fn first_str(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.0.get(*key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// First boolean value among `keys`, in order
    pub fn first_bool(&self, keys: &[&str]) -> Option<bool> {
        keys.iter().find_map(|key| self.0.get(*key)?.as_bool())
    }

    /// First non-empty string element of the array stored under `key`
    pub fn first_array_str(&self, key: &str) -> Option<String> {
        self.0
            .get(key)?
            .as_array()?
            .iter()
            .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
            .map(|s| s.trim().to_string())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwrap into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawCapabilityRecord {
        RawCapabilityRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_first_str_precedence() {
        let rec = record(json!({"webMethod": "createCustomer", "methodName": "other"}));
        assert_eq!(
            rec.first_str(&["name", "webMethod", "methodName"]),
            Some("createCustomer".to_string())
        );
    }

    #[test]
    fn test_first_str_skips_blank_and_null() {
        let rec = record(json!({"name": "  ", "webMethod": null, "methodName": "getBill"}));
        assert_eq!(
            rec.first_str(&["name", "webMethod", "methodName"]),
            Some("getBill".to_string())
        );
    }

    #[test]
    fn test_first_array_str() {
        let rec = record(json!({"endpoints": ["", "/v1/orders", "/v1/items"]}));
        assert_eq!(rec.first_array_str("endpoints"), Some("/v1/orders".to_string()));
        assert_eq!(rec.first_array_str("missing"), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(RawCapabilityRecord::from_value(json!([1, 2])).is_none());
        assert!(RawCapabilityRecord::from_value(json!("name")).is_none());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let rec = RawCapabilityRecord::new().with("name", "listOrders");
        assert_eq!(serde_json::to_value(&rec).unwrap(), json!({"name": "listOrders"}));
    }
}
