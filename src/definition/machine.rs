//! Machine definitions and the pure transition function.

use super::error::{DefinitionError, InvalidDefinition};
use super::node::{StateNode, StateNodeBuilder};
use super::transition::select;
use crate::core::{apply_actions, Context, Event, Partial, Snapshot, State};
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// How an event was resolved against the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The state has no candidates for the event kind.
    Unhandled,
    /// Candidates exist but every guard failed.
    Rejected,
    /// A context-only candidate was taken; the state was not exited.
    Internal,
    /// A candidate with a target was taken; the target state was entered.
    Entered,
}

impl Resolution {
    /// Whether the event changed anything.
    pub fn is_noop(self) -> bool {
        matches!(self, Self::Unhandled | Self::Rejected)
    }
}

/// Result of applying one event to a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Step<S: State> {
    pub snapshot: Snapshot<S>,
    pub resolution: Resolution,
}

/// Immutable, validated machine description.
///
/// Definitions are pure data: `transition` computes the next snapshot
/// without side effects, and any number of interpreters may share one
/// definition.
#[derive(Clone, Debug)]
pub struct MachineDefinition<S: State> {
    id: String,
    initial: S,
    initial_context: Context,
    states: HashMap<S, StateNode<S>>,
}

impl<S: State> MachineDefinition<S> {
    /// Start building a machine called `id`.
    pub fn builder(id: impl Into<String>) -> MachineBuilder<S> {
        MachineBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn initial_state(&self) -> &S {
        &self.initial
    }

    pub fn initial_context(&self) -> &Context {
        &self.initial_context
    }

    pub fn node(&self, state: &S) -> Option<&StateNode<S>> {
        self.states.get(state)
    }

    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.states.keys()
    }

    /// Snapshot of a freshly started machine.
    ///
    /// `context` fields override the definition's initial context; the
    /// initial state's entry actions then run against the result.
    pub fn initial_snapshot(&self, context: Option<Context>) -> Snapshot<S> {
        let base = match context {
            Some(overrides) => self.initial_context.merge(overrides.as_map().clone()),
            None => self.initial_context.clone(),
        };
        let context = match self.states.get(&self.initial) {
            Some(node) => apply_actions(&node.entry, &base, &Event::named("init")),
            None => base,
        };
        Snapshot::new(self.initial.clone(), context)
    }

    /// Apply `event` to `snapshot`.
    ///
    /// Transition actions run as one batch against the pre-transition
    /// context; when a state is entered its entry actions run as a second
    /// batch against the result.
    pub fn transition(&self, snapshot: &Snapshot<S>, event: &Event) -> Step<S> {
        let unchanged = |resolution| Step {
            snapshot: snapshot.clone(),
            resolution,
        };

        let Some(candidates) = self
            .states
            .get(&snapshot.state)
            .and_then(|node| node.candidates_for(&event.kind))
        else {
            return unchanged(Resolution::Unhandled);
        };

        let Some(chosen) = select(candidates, &snapshot.context, event) else {
            return unchanged(Resolution::Rejected);
        };

        let context = apply_actions(&chosen.actions, &snapshot.context, event);

        match &chosen.target {
            None => Step {
                snapshot: Snapshot::new(snapshot.state.clone(), context),
                resolution: Resolution::Internal,
            },
            Some(target) => {
                let context = match self.states.get(target) {
                    Some(node) => apply_actions(&node.entry, &context, event),
                    None => context,
                };
                Step {
                    snapshot: Snapshot::new(target.clone(), context),
                    resolution: Resolution::Entered,
                }
            }
        }
    }

    /// Whether `event` would select a candidate in `snapshot`. Pure.
    pub fn can_transition(&self, snapshot: &Snapshot<S>, event: &Event) -> bool {
        self.states
            .get(&snapshot.state)
            .and_then(|node| node.candidates_for(&event.kind))
            .is_some_and(|candidates| select(candidates, &snapshot.context, event).is_some())
    }
}

/// Builder for constructing machine definitions with a fluent API.
///
/// # Example
///
/// ```rust
/// use statecraft::definition::{MachineDefinition, StateNode, Transition};
/// use statecraft::{patch, state_enum};
///
/// state_enum! {
///     enum Toggle {
///         Off = "off",
///         On = "on",
///     }
/// }
///
/// let machine = MachineDefinition::builder("toggle")
///     .initial(Toggle::Off)
///     .context(patch! { "flips" => 0 })
///     .state(StateNode::build(Toggle::Off).on("FLIP", Transition::to(Toggle::On)))
///     .state(StateNode::build(Toggle::On).on("FLIP", Transition::to(Toggle::Off)))
///     .build()
///     .unwrap();
///
/// assert_eq!(machine.id(), "toggle");
/// ```
pub struct MachineBuilder<S: State> {
    id: String,
    initial: Option<S>,
    context: Partial,
    nodes: Vec<StateNode<S>>,
    issues: Vec<DefinitionError>,
}

impl<S: State> MachineBuilder<S> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            initial: None,
            context: Partial::new(),
            nodes: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Set the initial context.
    pub fn context(mut self, context: Partial) -> Self {
        self.context = context;
        self
    }

    /// Add a state node.
    pub fn state(mut self, node: StateNodeBuilder<S>) -> Self {
        let (node, issues) = node.finish();
        self.issues.extend(issues);
        self.nodes.push(node);
        self
    }

    /// Check the definition, accumulating every problem found.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<DefinitionError>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<DefinitionError>>> = self
            .issues
            .iter()
            .cloned()
            .map(Validation::fail)
            .collect();

        let declared: Vec<&S> = self.nodes.iter().map(|node| &node.state).collect();

        for (index, node) in self.nodes.iter().enumerate() {
            if declared[..index].contains(&&node.state) {
                checks.push(Validation::fail(DefinitionError::DuplicateState {
                    state: node.state.name().to_string(),
                }));
            }

            for (event, candidate) in node.all_transitions() {
                if let Some(target) = &candidate.target {
                    if !declared.contains(&target) {
                        checks.push(Validation::fail(DefinitionError::DanglingTarget {
                            state: node.state.name().to_string(),
                            event: event.to_string(),
                            target: target.name().to_string(),
                        }));
                    }
                }
            }
        }

        match &self.initial {
            None => checks.push(Validation::fail(DefinitionError::MissingInitialState)),
            Some(initial) if !declared.contains(&initial) => {
                checks.push(Validation::fail(DefinitionError::UnknownInitialState {
                    state: initial.name().to_string(),
                }))
            }
            Some(_) => {}
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Build the definition, failing with every problem found.
    pub fn build(self) -> Result<MachineDefinition<S>, InvalidDefinition> {
        if let Validation::Failure(errors) = self.validate() {
            return Err(InvalidDefinition {
                machine: self.id,
                issues: errors.iter().cloned().collect(),
            });
        }

        let initial = self.initial.ok_or_else(|| InvalidDefinition {
            machine: self.id.clone(),
            issues: vec![DefinitionError::MissingInitialState],
        })?;

        let states = self
            .nodes
            .into_iter()
            .map(|node| (node.state.clone(), node))
            .collect();

        Ok(MachineDefinition {
            id: self.id,
            initial,
            initial_context: Context::from(self.context),
            states,
        })
    }
}
