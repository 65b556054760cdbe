//! The interpreter: one task driving one machine instance.

use super::error::InterpreterError;
use super::inspect::Inspector;
use super::invoke::InvocationManager;
use super::mail::{Listener, Mail, Scope};
use super::options::InterpreterOptions;
use super::scheduler::Scheduler;
use crate::core::{Event, Snapshot, State};
use crate::definition::{MachineDefinition, Resolution};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

/// Handle to a running machine instance.
///
/// Handles are cheap to clone and may be used from any thread. Every event,
/// whether sent through a handle, fired by a timer or produced by an invoked
/// service, goes through one mailbox and is processed to completion before
/// the next one.
///
/// The interpreter task ends on [`stop`](Interpreter::stop) or once every
/// handle is dropped.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
/// use statecraft::machines::cart::{self, CartState};
/// use statecraft::runtime::Interpreter;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cart = Interpreter::create(cart::machine());
///
/// let snapshot = cart
///     .dispatch(Event::new("ADD_ITEM", json!({ "id": 1, "name": "Tea", "price": 4.5 })))
///     .await?;
///
/// assert_eq!(snapshot.state, CartState::Active);
/// assert_eq!(snapshot.context.f64("total"), Some(4.5));
///
/// cart.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Interpreter<S: State> {
    shared: Arc<Shared<S>>,
}

struct Shared<S: State> {
    label: String,
    definition: Arc<MachineDefinition<S>>,
    mailbox: UnboundedSender<Mail<S>>,
    snapshots: watch::Receiver<Snapshot<S>>,
    next_listener: AtomicU64,
}

impl<S: State> Clone for Interpreter<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: State> Interpreter<S> {
    /// Start an interpreter with default options.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create(definition: MachineDefinition<S>) -> Self {
        Self::create_with(definition, InterpreterOptions::new())
    }

    /// Start an interpreter.
    ///
    /// The initial state's entry actions run before this returns; its
    /// invocation and timers start as soon as the interpreter task runs.
    /// Must be called from within a tokio runtime.
    pub fn create_with(definition: MachineDefinition<S>, options: InterpreterOptions<S>) -> Self {
        Self::from_shared(Arc::new(definition), options)
    }

    /// Start an interpreter running a definition shared with other instances.
    pub fn from_shared(definition: Arc<MachineDefinition<S>>, options: InterpreterOptions<S>) -> Self {
        let label = options.label_or(definition.id()).to_string();
        let initial = definition.initial_snapshot(options.context);

        let (sender, receiver) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(initial.clone());

        let driver = Driver {
            label: label.clone(),
            definition: Arc::clone(&definition),
            snapshot: initial,
            generation: 0,
            mailbox: sender.downgrade(),
            scheduler: Scheduler::default(),
            invocations: InvocationManager::default(),
            listeners: Vec::new(),
            publisher,
            inspector: options.inspector,
        };

        info!(machine = %label, state = %definition.initial_state().name(), "interpreter started");
        tokio::spawn(driver.run(receiver));

        Self {
            shared: Arc::new(Shared {
                label,
                definition,
                mailbox: sender,
                snapshots,
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    /// Machine id, or the label given in the options.
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn definition(&self) -> &MachineDefinition<S> {
        &self.shared.definition
    }

    /// Enqueue an event without waiting for it to be processed.
    pub fn send(&self, event: Event) -> Result<(), InterpreterError> {
        self.post(Mail::External { event, reply: None })
    }

    /// Enqueue an event and wait for the snapshot it produced.
    pub async fn dispatch(&self, event: Event) -> Result<Snapshot<S>, InterpreterError> {
        let (reply, processed) = oneshot::channel();
        self.post(Mail::External {
            event,
            reply: Some(reply),
        })?;
        processed.await.map_err(|_| self.stopped())
    }

    /// The most recently published snapshot.
    pub fn get_snapshot(&self) -> Snapshot<S> {
        self.shared.snapshots.borrow().clone()
    }

    /// A receiver that sees every published snapshot.
    pub fn watch(&self) -> watch::Receiver<Snapshot<S>> {
        self.shared.snapshots.clone()
    }

    /// Call `listener` with every snapshot published from now on.
    ///
    /// The listener runs inside the interpreter task; a panicking listener
    /// is logged and does not affect the machine.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Snapshot<S>) + Send + 'static,
    {
        let id = self.shared.next_listener.fetch_add(1, Ordering::Relaxed);
        let listener: Listener<S> = Box::new(listener);
        if self.post(Mail::Subscribe { id, listener }).is_err() {
            debug!(machine = %self.shared.label, "subscribing to a stopped interpreter");
        }

        let mailbox = self.shared.mailbox.downgrade();
        Subscription::new(move || {
            if let Some(sender) = mailbox.upgrade() {
                let _ = sender.send(Mail::Unsubscribe { id });
            }
        })
    }

    /// Whether `kind` would select a transition in the current snapshot.
    ///
    /// Pure: nothing is enqueued and no state changes.
    pub fn can_transition(&self, kind: &str, payload: Option<Value>) -> bool {
        let event = Event::new(kind, payload.unwrap_or(Value::Null));
        !event.is_synthetic() && self.shared.definition.can_transition(&self.get_snapshot(), &event)
    }

    /// Cancel pending timers and services and end the interpreter task.
    ///
    /// Idempotent; returns once the task has stopped.
    pub async fn stop(&self) {
        let (reply, stopped) = oneshot::channel();
        if self.post(Mail::Stop { reply }).is_ok() {
            let _ = stopped.await;
        }
    }

    pub fn is_running(&self) -> bool {
        !self.shared.mailbox.is_closed()
    }

    fn post(&self, mail: Mail<S>) -> Result<(), InterpreterError> {
        self.shared.mailbox.send(mail).map_err(|_| self.stopped())
    }

    fn stopped(&self) -> InterpreterError {
        InterpreterError::Stopped {
            machine: self.shared.label.clone(),
        }
    }
}

/// Registration of a snapshot listener.
///
/// Dropping the subscription unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

/// State owned by the interpreter task.
struct Driver<S: State> {
    label: String,
    definition: Arc<MachineDefinition<S>>,
    snapshot: Snapshot<S>,
    generation: u64,
    mailbox: WeakUnboundedSender<Mail<S>>,
    scheduler: Scheduler,
    invocations: InvocationManager,
    listeners: Vec<(u64, Listener<S>)>,
    publisher: watch::Sender<Snapshot<S>>,
    inspector: Option<Arc<dyn Inspector<S>>>,
}

impl<S: State> Driver<S> {
    async fn run(mut self, mut mailbox: UnboundedReceiver<Mail<S>>) {
        self.enter_scope();

        while let Some(mail) = mailbox.recv().await {
            match mail {
                Mail::External { event, reply } => {
                    if event.is_synthetic() {
                        warn!(
                            machine = %self.label,
                            event = %event.kind,
                            "ignoring externally sent synthetic event"
                        );
                    } else {
                        self.process(event);
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(self.snapshot.clone());
                    }
                }
                Mail::Scoped { generation, event } => {
                    if generation == self.generation {
                        self.process(event);
                    } else {
                        debug!(
                            machine = %self.label,
                            event = %event.kind,
                            generation,
                            current = self.generation,
                            "dropping stale event"
                        );
                    }
                }
                Mail::Subscribe { id, listener } => self.listeners.push((id, listener)),
                Mail::Unsubscribe { id } => self.listeners.retain(|(listener, _)| *listener != id),
                Mail::Stop { reply } => {
                    self.exit_scope();
                    mailbox.close();
                    info!(machine = %self.label, state = %self.snapshot.state.name(), "interpreter stopped");
                    let _ = reply.send(());
                    return;
                }
            }
        }

        self.exit_scope();
        debug!(machine = %self.label, "every handle dropped, interpreter exiting");
    }

    fn process(&mut self, event: Event) {
        if let Some(inspector) = &self.inspector {
            inspector.on_event(&event);
        }

        let step = self.definition.transition(&self.snapshot, &event);
        let from = self.snapshot.state.clone();

        match step.resolution {
            Resolution::Unhandled => {
                debug!(machine = %self.label, state = %from.name(), event = %event.kind, "event not handled")
            }
            Resolution::Rejected => {
                debug!(machine = %self.label, state = %from.name(), event = %event.kind, "every guard rejected the event")
            }
            Resolution::Internal => {
                debug!(machine = %self.label, state = %from.name(), event = %event.kind, "context updated")
            }
            Resolution::Entered => {
                debug!(
                    machine = %self.label,
                    from = %from.name(),
                    to = %step.snapshot.state.name(),
                    event = %event.kind,
                    "transition"
                );
                self.exit_scope();
            }
        }

        self.snapshot = step.snapshot;

        if step.resolution == Resolution::Entered {
            if let Some(inspector) = &self.inspector {
                inspector.on_transition(&from, &self.snapshot, &event);
            }
            self.enter_scope();
        }

        self.publish();
    }

    /// Start the invocation and timers of the current state under a new generation.
    fn enter_scope(&mut self) {
        self.generation += 1;
        let Some(node) = self.definition.node(&self.snapshot.state) else {
            return;
        };
        let scope = Scope::new(self.generation, self.mailbox.clone());

        self.scheduler.arm(node.delayed(), &scope);
        if let Some(invocation) = node.invocation() {
            self.invocations.start(invocation, &self.snapshot.context, scope);
        }
    }

    fn exit_scope(&mut self) {
        if self.invocations.is_running() || self.scheduler.pending() > 0 {
            debug!(
                machine = %self.label,
                state = %self.snapshot.state.name(),
                timers = self.scheduler.pending(),
                "cancelling state scope"
            );
        }
        self.scheduler.cancel_all();
        self.invocations.cancel();
    }

    fn publish(&mut self) {
        self.publisher.send_replace(self.snapshot.clone());

        for (id, listener) in &self.listeners {
            let snapshot = &self.snapshot;
            if catch_unwind(AssertUnwindSafe(|| listener(snapshot))).is_err() {
                warn!(machine = %self.label, listener = id, "snapshot listener panicked");
            }
        }

        if let Some(inspector) = &self.inspector {
            inspector.on_snapshot(&self.snapshot);
        }
    }
}
