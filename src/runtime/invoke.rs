//! Lifecycle of the service invoked by the active state.

use super::mail::Scope;
use crate::core::{Context, Event, State};
use crate::definition::{Invocation, ServiceError, ServiceFuture};
use futures::future::{self, FutureExt};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct Running {
    id: String,
    task: JoinHandle<()>,
}

/// Owns the task of the single service tied to the current state entry.
///
/// Results travel back as `done.invoke.<id>` / `error.invoke.<id>` events
/// tagged with the entry generation, so a result that settles after the
/// state was left is discarded by the interpreter.
#[derive(Default)]
pub(crate) struct InvocationManager {
    running: Option<Running>,
}

impl InvocationManager {
    /// Start `invocation` against the context committed on entry.
    ///
    /// A previous service is cancelled first. A service that panics, either
    /// while creating its future or while running it, is reported as an
    /// error event.
    pub(crate) fn start<S: State>(
        &mut self,
        invocation: &Invocation<S>,
        context: &Context,
        scope: Scope<S>,
    ) {
        self.cancel();

        let id = invocation.id().to_string();
        let service = match catch_unwind(AssertUnwindSafe(|| invocation.start(context))) {
            Ok(service) => service,
            Err(panic) => failed(panic_message(panic.as_ref())),
        };

        debug!(invoke = %id, generation = scope.generation(), "starting service");

        let task_id = id.clone();
        let task = tokio::spawn(async move {
            let event = match AssertUnwindSafe(service).catch_unwind().await {
                Ok(Ok(value)) => Event::done_invoke(&task_id, value),
                Ok(Err(error)) => {
                    warn!(invoke = %task_id, error = %error, "service failed");
                    Event::error_invoke(&task_id, &error.message)
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    warn!(invoke = %task_id, error = %message, "service panicked");
                    Event::error_invoke(&task_id, &message)
                }
            };
            if !scope.post(event) {
                debug!(invoke = %task_id, "interpreter gone, dropping service result");
            }
        });

        self.running = Some(Running { id, task });
    }

    /// Abort the running service, if any.
    pub(crate) fn cancel(&mut self) {
        if let Some(running) = self.running.take() {
            if !running.task.is_finished() {
                debug!(invoke = %running.id, "cancelling service");
            }
            running.task.abort();
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }
}

impl Drop for InvocationManager {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn failed(message: String) -> ServiceFuture {
    future::ready(Err(ServiceError::new(message))).boxed()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("service panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("service panicked: {message}")
    } else {
        "service panicked".to_string()
    }
}
