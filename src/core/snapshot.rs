//! Observable machine snapshots.

use super::context::Context;
use super::state::State;
use serde::{Deserialize, Serialize};

/// The externally observable `(state, context)` pair.
///
/// Snapshots are immutable values; a new one is published after every
/// processed event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Snapshot<S: State> {
    pub state: S,
    pub context: Context,
}

impl<S: State> Snapshot<S> {
    pub fn new(state: S, context: Context) -> Self {
        Self { state, context }
    }

    pub fn state_name(&self) -> &str {
        self.state.name()
    }

    pub fn matches(&self, state: &S) -> bool {
        self.state == *state
    }
}
