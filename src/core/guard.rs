//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions over `(context, event)` that decide
//! whether a candidate transition may be taken. They never mutate anything
//! and must not panic on missing payload fields: absence reads as a failing
//! condition.

use super::context::Context;
use super::event::Event;
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&Context, &Event) -> bool + Send + Sync>;

/// Pure predicate that determines if a candidate transition can be taken.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Context, Event, Guard};
/// use serde_json::json;
///
/// let is_admin = Guard::named("isAdmin", |_ctx: &Context, event: &Event| {
///     event.payload_str("role") == Some("admin")
/// });
///
/// let context = Context::new();
/// assert!(is_admin.check(&context, &Event::new("LOGIN", json!({ "role": "admin" }))));
/// assert!(!is_admin.check(&context, &Event::named("LOGIN")));
/// ```
#[derive(Clone)]
pub struct Guard {
    name: Option<String>,
    predicate: Predicate,
}

impl Guard {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic, free of side effects and
    /// thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Context, &Event) -> bool + Send + Sync + 'static,
    {
        Guard {
            name: None,
            predicate: Arc::new(predicate),
        }
    }

    /// Create a guard carrying a name for diagnostics.
    pub fn named<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Context, &Event) -> bool + Send + Sync + 'static,
    {
        Guard {
            name: Some(name.into()),
            predicate: Arc::new(predicate),
        }
    }

    pub fn check(&self, context: &Context, event: &Event) -> bool {
        (self.predicate)(context, event)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("name", &self.name.as_deref().unwrap_or("<anonymous>"))
            .finish()
    }
}
