//! Events delivered to a machine.
//!
//! External events and the synthetic events produced by invoked services and
//! delayed transitions share one shape; only the kind tells them apart.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const DONE_INVOKE_PREFIX: &str = "done.invoke.";
const ERROR_INVOKE_PREFIX: &str = "error.invoke.";
const AFTER_PREFIX: &str = "after.";

/// A discrete event: a kind plus an opaque JSON payload.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
/// use serde_json::json;
///
/// let event = Event::new("UPDATE_QUANTITY", json!({ "itemId": 3, "quantity": 2 }));
/// assert_eq!(event.payload_u64("quantity"), Some(2));
/// assert!(event.payload_str("itemId").is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// An event without payload.
    pub fn named(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Success event of the invocation `id`, carrying the resolved value.
    pub fn done_invoke(id: &str, value: Value) -> Self {
        Self::new(done_invoke_kind(id), value)
    }

    /// Failure event of the invocation `id`. The payload is `{"message": ...}`.
    pub fn error_invoke(id: &str, message: &str) -> Self {
        Self::new(error_invoke_kind(id), json!({ "message": message }))
    }

    /// Reserved kinds are produced by the runtime itself.
    pub fn is_synthetic(&self) -> bool {
        is_reserved_kind(&self.kind)
    }

    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn payload_f64(&self, key: &str) -> Option<f64> {
        self.payload.get(key).and_then(Value::as_f64)
    }

    pub fn payload_u64(&self, key: &str) -> Option<u64> {
        self.payload.get(key).and_then(Value::as_u64)
    }
}

pub fn done_invoke_kind(id: &str) -> String {
    format!("{DONE_INVOKE_PREFIX}{id}")
}

pub fn error_invoke_kind(id: &str) -> String {
    format!("{ERROR_INVOKE_PREFIX}{id}")
}

/// Kind of the event posted when a delay armed by `state` elapses.
pub fn after_kind(delay: Duration, state: &str) -> String {
    format!("{AFTER_PREFIX}{}.{state}", delay.as_millis())
}

pub fn is_reserved_kind(kind: &str) -> bool {
    kind.starts_with(DONE_INVOKE_PREFIX)
        || kind.starts_with(ERROR_INVOKE_PREFIX)
        || kind.starts_with(AFTER_PREFIX)
}
