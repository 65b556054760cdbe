//! Statecraft: declarative state machines with a pure core and an async shell.
//!
//! A machine is plain data: states, guarded transitions, assign actions,
//! entry actions, services invoked on entry, and transitions taken after a
//! delay. The pure core computes the next `(state, context)` snapshot for
//! an event; the runtime drives one instance on a tokio task, turning timer
//! firings and service results into events on the same mailbox.
//!
//! # Core Concepts
//!
//! - **State**: Type-safe state representation via the `State` trait and the
//!   `state_enum!` macro
//! - **Context**: Immutable JSON object replaced on every update
//! - **Guards and actions**: Pure functions over `(context, event)`
//! - **Definitions**: Validated machine descriptions with a pure transition function
//! - **Interpreter**: One serialized mailbox per running instance
//!
//! # Example
//!
//! ```rust
//! use statecraft::core::Event;
//! use statecraft::definition::{MachineDefinition, StateNode, Transition};
//! use statecraft::runtime::Interpreter;
//! use statecraft::{patch, state_enum};
//! use std::time::Duration;
//!
//! state_enum! {
//!     enum Light {
//!         Green = "green",
//!         Yellow = "yellow",
//!         Red = "red",
//!     }
//! }
//!
//! let machine = MachineDefinition::builder("light")
//!     .initial(Light::Green)
//!     .context(patch! { "cycles" => 0 })
//!     .state(StateNode::build(Light::Green).on("NEXT", Transition::to(Light::Yellow)))
//!     .state(
//!         StateNode::build(Light::Yellow)
//!             .after(Duration::from_millis(500), Transition::to(Light::Red)),
//!     )
//!     .state(StateNode::build(Light::Red).on(
//!         "NEXT",
//!         Transition::to(Light::Green).assign(|ctx, _| {
//!             patch! { "cycles" => ctx.f64("cycles").unwrap_or(0.0) + 1.0 }
//!         }),
//!     ))
//!     .build()?;
//!
//! // Pure core: no runtime needed.
//! let yellow = machine.transition(&machine.initial_snapshot(None), &Event::named("NEXT"));
//! assert_eq!(yellow.snapshot.state, Light::Yellow);
//!
//! // Async shell.
//! # tokio::runtime::Builder::new_current_thread().enable_all().build()?.block_on(async {
//! let light = Interpreter::create(machine);
//! light.dispatch(Event::named("NEXT")).await?;
//! tokio::time::sleep(Duration::from_millis(600)).await;
//! assert_eq!(light.get_snapshot().state, Light::Red);
//! light.stop().await;
//! # Ok::<(), statecraft::runtime::InterpreterError>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod definition;
pub mod machines;
pub mod runtime;

// Re-export commonly used types
pub use core::{Action, Context, Event, Guard, Partial, Snapshot, State, StateHistory, StateTransition};
pub use definition::{
    DefinitionError, Invocation, InvalidDefinition, MachineBuilder, MachineDefinition, ServiceError,
    StateNode, Transition,
};
pub use runtime::{Interpreter, InterpreterError, InterpreterOptions};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::json;
}
