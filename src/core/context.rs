//! Immutable machine context.
//!
//! The context is a JSON object shared behind an `Arc`. Reducers never touch
//! it in place: every update produces a new `Context` with a new identity, so
//! observers holding an older snapshot keep a consistent view and can detect
//! changes with a pointer comparison.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A partial context update produced by an assign action.
pub type Partial = Map<String, Value>;

/// Immutable, cheaply cloneable JSON object holding a machine's extended state.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Context;
/// use statecraft::patch;
///
/// let context = Context::from(patch! { "total" => 0.0, "items" => Vec::<u32>::new() });
/// let updated = context.merge(patch! { "total" => 12.5 });
///
/// assert_eq!(context.f64("total"), Some(0.0));
/// assert_eq!(updated.f64("total"), Some(12.5));
/// assert!(!updated.same_as(&context));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    fields: Arc<Map<String, Value>>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON value. Returns `None` unless the value is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from(map)),
            _ => None,
        }
    }

    /// Return a new context with `partial` merged field-by-field over this one.
    ///
    /// The receiver is left untouched and the result always has a fresh identity.
    pub fn merge(&self, partial: Partial) -> Self {
        let mut fields = (*self.fields).clone();
        for (key, value) in partial {
            fields.insert(key, value);
        }
        Self {
            fields: Arc::new(fields),
        }
    }

    /// Whether both handles point at the same context value.
    pub fn same_as(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Deserialize a field into `T`. Missing or mistyped fields yield `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.fields.get(key).and_then(Value::as_object)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object((*self.fields).clone())
    }
}

impl From<Map<String, Value>> for Context {
    fn from(fields: Map<String, Value>) -> Self {
        Self {
            fields: Arc::new(fields),
        }
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other) || self.fields == other.fields
    }
}

impl Serialize for Context {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Context {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Context::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch;
    use serde_json::json;

    #[test]
    fn merge_returns_new_identity() {
        let context = Context::from(patch! { "count" => 1 });
        let merged = context.merge(Partial::new());

        assert!(!merged.same_as(&context));
        assert_eq!(merged, context);
    }

    #[test]
    fn merge_leaves_original_untouched() {
        let context = Context::from(patch! { "count" => 1, "name" => "a" });
        let merged = context.merge(patch! { "count" => 2 });

        assert_eq!(context.get("count"), Some(&json!(1)));
        assert_eq!(merged.get("count"), Some(&json!(2)));
        assert_eq!(merged.str("name"), Some("a"));
    }

    #[test]
    fn clone_shares_identity() {
        let context = Context::from(patch! { "count" => 1 });
        let clone = context.clone();
        assert!(clone.same_as(&context));
    }

    #[test]
    fn typed_accessors_tolerate_missing_fields() {
        let context = Context::new();
        assert!(context.str("missing").is_none());
        assert!(context.f64("missing").is_none());
        assert!(context.get_as::<Vec<u32>>("missing").is_none());
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(Context::from_value(json!([1, 2])).is_none());
        assert!(Context::from_value(json!({ "a": 1 })).is_some());
    }

    #[test]
    fn context_serializes_as_plain_object() {
        let context = Context::from(patch! { "flag" => true });
        let json = serde_json::to_string(&context).unwrap();
        assert_eq!(json, r#"{"flag":true}"#);

        let back: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(back, context);
    }
}
