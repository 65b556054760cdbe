//! State transition history tracking.
//!
//! Tracks committed transitions over time, optionally keeping only the most
//! recent ones. The interpreter never keeps history itself; a
//! [`HistoryRecorder`](crate::runtime::HistoryRecorder) inspector builds one
//! when a caller asks for it.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single committed transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being left
    pub from: S,
    /// The state being entered
    pub to: S,
    /// Kind of the event that caused the transition
    pub event: String,
    /// When the transition was committed
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of state transitions.
///
/// A bounded history keeps the most recent `limit` transitions and counts
/// the ones it evicted.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{StateHistory, StateTransition};
/// use statecraft::state_enum;
/// use chrono::Utc;
///
/// state_enum! {
///     enum Phase {
///         Start,
///         Middle,
///         End,
///     }
/// }
///
/// let step = |from, to| StateTransition {
///     from,
///     to,
///     event: "NEXT".to_string(),
///     timestamp: Utc::now(),
/// };
///
/// let history = StateHistory::new()
///     .record(step(Phase::Start, Phase::Middle))
///     .record(step(Phase::Middle, Phase::End));
/// assert_eq!(history.get_path(), vec![&Phase::Start, &Phase::Middle, &Phase::End]);
///
/// let mut recent = StateHistory::bounded(1);
/// recent.push(step(Phase::Start, Phase::Middle));
/// recent.push(step(Phase::Middle, Phase::End));
/// assert_eq!(recent.get_path(), vec![&Phase::Middle, &Phase::End]);
/// assert_eq!(recent.evicted(), 1);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: VecDeque<StateTransition<S>>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    evicted: usize,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// An unbounded history.
    pub fn new() -> Self {
        Self {
            transitions: VecDeque::new(),
            limit: None,
            evicted: 0,
        }
    }

    /// A history keeping at most `limit` transitions.
    pub fn bounded(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Append a transition, evicting the oldest one when the history is full.
    pub fn push(&mut self, transition: StateTransition<S>) {
        if let Some(limit) = self.limit {
            if limit == 0 {
                self.evicted += 1;
                return;
            }
            while self.transitions.len() >= limit {
                self.transitions.pop_front();
                self.evicted += 1;
            }
        }
        self.transitions.push_back(transition);
    }

    /// Chaining form of [`push`](Self::push).
    pub fn record(mut self, transition: StateTransition<S>) -> Self {
        self.push(transition);
        self
    }

    /// States traversed by the retained transitions, starting with the state
    /// the oldest one left.
    pub fn get_path(&self) -> Vec<&S> {
        self.transitions
            .front()
            .map(|first| &first.from)
            .into_iter()
            .chain(self.transitions.iter().map(|transition| &transition.to))
            .collect()
    }

    /// Time between the oldest and newest retained transitions.
    pub fn duration(&self) -> Option<Duration> {
        let first = self.transitions.front()?;
        let last = self.transitions.back()?;
        (last.timestamp - first.timestamp).to_std().ok()
    }

    pub fn transitions(&self) -> &VecDeque<StateTransition<S>> {
        &self.transitions
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// How many transitions were dropped to stay within the limit.
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
