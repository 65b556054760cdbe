//! Assign actions: pure reducers over the context.
//!
//! An action maps `(context, event)` to a [`Partial`] update. All actions of
//! one transition read the same pre-transition context; their partials are
//! merged in declaration order into a single new context.

use super::context::{Context, Partial};
use super::event::Event;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type Assigner = Arc<dyn Fn(&Context, &Event) -> Partial + Send + Sync>;

/// A context-assign action.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{apply_actions, Action, Context, Event};
/// use statecraft::patch;
///
/// let bump = Action::assign(|ctx: &Context, _: &Event| {
///     patch! { "count" => ctx.f64("count").unwrap_or(0.0) + 1.0 }
/// });
/// let label = Action::set("label", "bumped");
///
/// let context = Context::from(patch! { "count" => 1.0 });
/// let next = apply_actions(&[bump, label], &context, &Event::named("BUMP"));
///
/// assert_eq!(next.f64("count"), Some(2.0));
/// assert_eq!(next.str("label"), Some("bumped"));
/// ```
#[derive(Clone)]
pub struct Action {
    assigner: Assigner,
}

impl Action {
    /// Create an action from a pure reducer returning the fields to replace.
    pub fn assign<F>(reducer: F) -> Self
    where
        F: Fn(&Context, &Event) -> Partial + Send + Sync + 'static,
    {
        Action {
            assigner: Arc::new(reducer),
        }
    }

    /// Assign a constant value to one field.
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        Self::assign(move |_, _| {
            let mut partial = Partial::new();
            partial.insert(field.clone(), value.clone());
            partial
        })
    }

    /// Assign a constant set of fields.
    pub fn reset(fields: Partial) -> Self {
        Self::assign(move |_, _| fields.clone())
    }

    pub fn evaluate(&self, context: &Context, event: &Event) -> Partial {
        (self.assigner)(context, event)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action")
    }
}

/// Apply `actions` as one atomic batch.
///
/// Every action sees `context` as it was before the batch. With no actions
/// the context is returned unchanged, identity included.
pub fn apply_actions(actions: &[Action], context: &Context, event: &Event) -> Context {
    if actions.is_empty() {
        return context.clone();
    }

    let mut merged = Partial::new();
    for action in actions {
        merged.extend(action.evaluate(context, event));
    }
    context.merge(merged)
}
