//! State nodes: everything a machine does while in one state.

use super::error::DefinitionError;
use super::invocation::Invocation;
use super::transition::Transition;
use crate::core::{after_kind, is_reserved_kind, Action, State};
use std::collections::HashMap;
use std::time::Duration;

/// Delayed transitions sharing one delay.
///
/// One timer is armed per group; when it fires, the group's candidates are
/// resolved like any other transition list.
#[derive(Clone, Debug)]
pub struct DelayedTransitions<S: State> {
    pub(crate) delay: Duration,
    pub(crate) kind: String,
    pub(crate) transitions: Vec<Transition<S>>,
}

impl<S: State> DelayedTransitions<S> {
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Kind of the synthetic event posted when the delay elapses.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn transitions(&self) -> &[Transition<S>] {
        &self.transitions
    }
}

/// Immutable description of one state.
#[derive(Clone, Debug)]
pub struct StateNode<S: State> {
    pub(crate) state: S,
    pub(crate) on: HashMap<String, Vec<Transition<S>>>,
    pub(crate) entry: Vec<Action>,
    pub(crate) invoke: Option<Invocation<S>>,
    pub(crate) after: Vec<DelayedTransitions<S>>,
}

impl<S: State> StateNode<S> {
    /// Start describing the node for `state`.
    pub fn build(state: S) -> StateNodeBuilder<S> {
        StateNodeBuilder::new(state)
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn entry(&self) -> &[Action] {
        &self.entry
    }

    pub fn invocation(&self) -> Option<&Invocation<S>> {
        self.invoke.as_ref()
    }

    pub fn delayed(&self) -> &[DelayedTransitions<S>] {
        &self.after
    }

    /// Externally sendable event kinds this node handles.
    pub fn event_kinds(&self) -> impl Iterator<Item = &str> {
        self.on.keys().map(String::as_str)
    }

    /// Candidate list for an event kind, external or synthetic.
    pub fn candidates_for(&self, kind: &str) -> Option<&[Transition<S>]> {
        if let Some(candidates) = self.on.get(kind) {
            return Some(candidates);
        }
        if let Some(invocation) = &self.invoke {
            if kind == invocation.done_kind() {
                return Some(&invocation.on_done);
            }
            if kind == invocation.error_kind() {
                return Some(&invocation.on_error);
            }
        }
        self.after
            .iter()
            .find(|group| group.kind == kind)
            .map(|group| group.transitions.as_slice())
    }

    /// A terminal node can never leave its state.
    pub fn is_terminal(&self) -> bool {
        self.on.is_empty()
            && self.after.is_empty()
            && self.invoke.as_ref().is_none_or(|inv| !inv.has_routes())
    }

    /// Every `(event kind, candidate)` pair, synthetic ones included.
    pub(crate) fn all_transitions(&self) -> Vec<(&str, &Transition<S>)> {
        let mut pairs = Vec::new();
        for (kind, candidates) in &self.on {
            pairs.extend(candidates.iter().map(|c| (kind.as_str(), c)));
        }
        if let Some(invocation) = &self.invoke {
            pairs.extend(invocation.on_done.iter().map(|c| (invocation.done_kind(), c)));
            pairs.extend(invocation.on_error.iter().map(|c| (invocation.error_kind(), c)));
        }
        for group in &self.after {
            pairs.extend(group.transitions.iter().map(|c| (group.kind.as_str(), c)));
        }
        pairs
    }
}

/// Fluent builder for a [`StateNode`].
///
/// Misuse (a second handler for one event kind, a second invocation, a
/// reserved event kind) is recorded and reported when the machine is built.
pub struct StateNodeBuilder<S: State> {
    node: StateNode<S>,
    issues: Vec<DefinitionError>,
}

impl<S: State> StateNodeBuilder<S> {
    pub fn new(state: S) -> Self {
        Self {
            node: StateNode {
                state,
                on: HashMap::new(),
                entry: Vec::new(),
                invoke: None,
                after: Vec::new(),
            },
            issues: Vec::new(),
        }
    }

    /// Handle `kind` with a single candidate.
    pub fn on(self, kind: impl Into<String>, transition: Transition<S>) -> Self {
        self.on_first(kind, vec![transition])
    }

    /// Handle `kind` with an ordered candidate list; the first passing guard wins.
    pub fn on_first(mut self, kind: impl Into<String>, candidates: Vec<Transition<S>>) -> Self {
        let kind = kind.into();
        let state = self.node.state.name().to_string();

        if is_reserved_kind(&kind) {
            self.issues.push(DefinitionError::ReservedEventKind { state, event: kind });
        } else if self.node.on.contains_key(&kind) {
            self.issues.push(DefinitionError::DuplicateHandler { state, event: kind });
        } else {
            self.node.on.insert(kind, candidates);
        }
        self
    }

    /// Run `action` whenever the state is entered.
    pub fn entry(mut self, action: Action) -> Self {
        self.node.entry.push(action);
        self
    }

    /// Invoke a service on entry.
    pub fn invoke(mut self, invocation: Invocation<S>) -> Self {
        if self.node.invoke.is_some() {
            self.issues.push(DefinitionError::DuplicateInvocation {
                state: self.node.state.name().to_string(),
            });
        } else {
            self.node.invoke = Some(invocation);
        }
        self
    }

    /// Take `transition` once `delay` has elapsed in this state.
    ///
    /// Delays count in whole milliseconds; anything finer is dropped.
    /// Candidates declared with the same delay form one ordered list.
    pub fn after(mut self, delay: Duration, transition: Transition<S>) -> Self {
        let delay = Duration::from_millis(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        match self.node.after.iter_mut().find(|group| group.delay == delay) {
            Some(group) => group.transitions.push(transition),
            None => {
                let kind = after_kind(delay, self.node.state.name());
                self.node.after.push(DelayedTransitions {
                    delay,
                    kind,
                    transitions: vec![transition],
                });
            }
        }
        self
    }

    pub(crate) fn finish(self) -> (StateNode<S>, Vec<DefinitionError>) {
        (self.node, self.issues)
    }
}
