//! Optional observers of an interpreter's activity.

use crate::core::{Event, Snapshot, State, StateHistory, StateTransition};
use chrono::Utc;
use std::sync::{Mutex, PoisonError};

/// Hooks called from inside the interpreter task.
///
/// Every hook defaults to doing nothing. Hooks run synchronously between
/// events, so they should return quickly.
pub trait Inspector<S: State>: Send + Sync {
    /// An event is about to be resolved.
    fn on_event(&self, _event: &Event) {}

    /// A state was entered. `from` is the state that was left.
    fn on_transition(&self, _from: &S, _snapshot: &Snapshot<S>, _event: &Event) {}

    /// A snapshot was published.
    fn on_snapshot(&self, _snapshot: &Snapshot<S>) {}
}

/// How many transitions a [`HistoryRecorder`] keeps unless told otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

/// Inspector recording entered states into a bounded [`StateHistory`].
///
/// Only the most recent transitions are kept; see
/// [`with_limit`](HistoryRecorder::with_limit).
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Context, Event, Snapshot};
/// use statecraft::runtime::{HistoryRecorder, Inspector};
/// use statecraft::state_enum;
///
/// state_enum! {
///     enum Phase {
///         Draft = "draft",
///         Sent = "sent",
///     }
/// }
///
/// let recorder = HistoryRecorder::new();
/// let sent = Snapshot::new(Phase::Sent, Context::new());
/// recorder.on_transition(&Phase::Draft, &sent, &Event::named("SEND"));
///
/// let history = recorder.history();
/// assert_eq!(history.get_path(), vec![&Phase::Draft, &Phase::Sent]);
/// ```
pub struct HistoryRecorder<S: State> {
    history: Mutex<StateHistory<S>>,
}

impl<S: State> Default for HistoryRecorder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> HistoryRecorder<S> {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Keep at most `limit` transitions.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            history: Mutex::new(StateHistory::bounded(limit)),
        }
    }

    /// The history recorded so far.
    pub fn history(&self) -> StateHistory<S> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<S: State> Inspector<S> for HistoryRecorder<S> {
    fn on_transition(&self, from: &S, snapshot: &Snapshot<S>, event: &Event) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push(StateTransition {
            from: from.clone(),
            to: snapshot.state.clone(),
            event: event.kind.clone(),
            timestamp: Utc::now(),
        });
    }
}
