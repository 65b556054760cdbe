//! Core machine types and logic.
//!
//! This module contains the pure functional core:
//! - State definitions via the `State` trait
//! - The immutable `Context` and the `Event` shape
//! - Guard predicates and assign actions over `(context, event)`
//! - Snapshots and immutable history tracking
//!
//! Nothing in this module performs I/O, spawns tasks or reads the clock
//! (history timestamps are supplied by the caller).

mod action;
mod context;
mod event;
mod guard;
mod history;
mod snapshot;
mod state;

pub use action::{apply_actions, Action};
pub use context::{Context, Partial};
pub use event::{after_kind, done_invoke_kind, error_invoke_kind, is_reserved_kind, Event};
pub use guard::Guard;
pub use history::{StateHistory, StateTransition};
pub use snapshot::Snapshot;
pub use state::State;
