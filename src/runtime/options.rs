//! Interpreter configuration.

use super::inspect::Inspector;
use crate::core::{Context, State};
use std::fmt;
use std::sync::Arc;

/// Options for [`Interpreter::create_with`](super::Interpreter::create_with).
///
/// # Example
///
/// ```rust
/// use statecraft::machines::cart;
/// use statecraft::runtime::{HistoryRecorder, InterpreterOptions};
/// use statecraft::patch;
/// use std::sync::Arc;
///
/// let options = InterpreterOptions::<cart::CartState>::new()
///     .context(patch! { "discountCode" => "SUMMER20" })
///     .inspector(Arc::new(HistoryRecorder::<cart::CartState>::new()))
///     .label("cart-1");
///
/// assert_eq!(options.label_or("cart"), "cart-1");
/// ```
pub struct InterpreterOptions<S: State> {
    pub(crate) context: Option<Context>,
    pub(crate) inspector: Option<Arc<dyn Inspector<S>>>,
    pub(crate) label: Option<String>,
}

impl<S: State> Default for InterpreterOptions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> InterpreterOptions<S> {
    pub fn new() -> Self {
        Self {
            context: None,
            inspector: None,
            label: None,
        }
    }

    /// Fields merged over the definition's initial context.
    pub fn context(mut self, context: impl Into<Context>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn inspector(mut self, inspector: Arc<dyn Inspector<S>>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Name used in log fields instead of the machine id.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label_or<'a>(&'a self, machine: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(machine)
    }
}

impl<S: State> fmt::Debug for InterpreterOptions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpreterOptions")
            .field("context", &self.context)
            .field("inspector", &self.inspector.is_some())
            .field("label", &self.label)
            .finish()
    }
}
