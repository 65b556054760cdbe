//! Declarative machine definitions.
//!
//! A [`MachineDefinition`] is built once with [`MachineBuilder`], validated
//! as a whole, and then shared by every interpreter running it. The
//! definition also exposes the pure transition function used by the
//! runtime and by tests that do not need an async executor.

mod error;
mod invocation;
mod machine;
pub mod macros;
mod node;
mod transition;

pub use error::{DefinitionError, InvalidDefinition};
pub use invocation::{Invocation, Service, ServiceError, ServiceFuture};
pub use machine::{MachineBuilder, MachineDefinition, Resolution, Step};
pub use node::{DelayedTransitions, StateNode, StateNodeBuilder};
pub use transition::{select, Transition};
