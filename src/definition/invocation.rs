//! Invoked services: asynchronous effects started on state entry.

use super::transition::Transition;
use crate::core::{done_invoke_kind, error_invoke_kind, Context, State};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an invoked service.
///
/// The message becomes the `message` field of the synthetic error event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Future returned by a service.
pub type ServiceFuture = BoxFuture<'static, Result<Value, ServiceError>>;

/// Factory creating a fresh service future from the context at entry time.
pub type Service = Arc<dyn Fn(&Context) -> ServiceFuture + Send + Sync>;

/// The service a state invokes on entry, with its completion routes.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Context;
/// use statecraft::definition::{Invocation, Transition};
/// use statecraft::state_enum;
/// use serde_json::json;
///
/// state_enum! {
///     enum Fetch {
///         Loading = "loading",
///         Ready = "ready",
///         Failed = "failed",
///     }
/// }
///
/// let invocation = Invocation::new("load", |_ctx: &Context| async { Ok(json!([1, 2, 3])) })
///     .on_done(Transition::to(Fetch::Ready))
///     .on_error(Transition::to(Fetch::Failed));
///
/// assert_eq!(invocation.done_kind(), "done.invoke.load");
/// ```
#[derive(Clone)]
pub struct Invocation<S: State> {
    pub(crate) id: String,
    pub(crate) service: Service,
    pub(crate) on_done: Vec<Transition<S>>,
    pub(crate) on_error: Vec<Transition<S>>,
    done_kind: String,
    error_kind: String,
}

impl<S: State> Invocation<S> {
    /// Create an invocation from an async service factory.
    ///
    /// The factory is called once per state entry with the context as it was
    /// committed; the future it returns must own everything it needs.
    pub fn new<F, Fut>(id: impl Into<String>, service: F) -> Self
    where
        F: Fn(&Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ServiceError>> + Send + 'static,
    {
        let id = id.into();
        Self {
            done_kind: done_invoke_kind(&id),
            error_kind: error_invoke_kind(&id),
            id,
            service: Arc::new(move |context: &Context| service(context).boxed()),
            on_done: Vec::new(),
            on_error: Vec::new(),
        }
    }

    /// Append a candidate taken when the service resolves.
    pub fn on_done(mut self, transition: Transition<S>) -> Self {
        self.on_done.push(transition);
        self
    }

    /// Append a candidate taken when the service fails.
    pub fn on_error(mut self, transition: Transition<S>) -> Self {
        self.on_error.push(transition);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn done_kind(&self) -> &str {
        &self.done_kind
    }

    pub fn error_kind(&self) -> &str {
        &self.error_kind
    }

    pub fn has_routes(&self) -> bool {
        !self.on_done.is_empty() || !self.on_error.is_empty()
    }

    pub(crate) fn start(&self, context: &Context) -> ServiceFuture {
        (self.service)(context)
    }
}

impl<S: State> fmt::Debug for Invocation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("id", &self.id)
            .field("on_done", &self.on_done)
            .field("on_error", &self.on_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch;
    use serde_json::json;

    crate::state_enum! {
        enum TestState {
            Loading = "loading",
            Ready = "ready",
        }
    }

    #[tokio::test]
    async fn service_receives_entry_context() {
        let invocation: Invocation<TestState> = Invocation::new("echo", |ctx: &Context| {
            let keyword = ctx.str("keyword").unwrap_or_default().to_string();
            async move { Ok(json!({ "echo": keyword })) }
        });

        let context = Context::from(patch! { "keyword" => "rust" });
        let result = invocation.start(&context).await;

        assert_eq!(result, Ok(json!({ "echo": "rust" })));
    }

    #[tokio::test]
    async fn service_errors_pass_through() {
        let invocation: Invocation<TestState> = Invocation::new("broken", |_: &Context| async {
            Err(ServiceError::new("offline"))
        });

        let result = invocation.start(&Context::new()).await;
        assert_eq!(result, Err(ServiceError::new("offline")));
    }

    #[test]
    fn routes_are_tracked() {
        let bare: Invocation<TestState> = Invocation::new("x", |_: &Context| async { Ok(Value::Null) });
        assert!(!bare.has_routes());

        let routed = bare.on_done(Transition::to(TestState::Ready));
        assert!(routed.has_routes());
        assert_eq!(routed.error_kind(), "error.invoke.x");
    }
}
