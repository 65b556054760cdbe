//! Candidate transitions and their selection.

use crate::core::{Action, Context, Event, Guard, Partial, State};

/// One candidate in an event's ordered transition list.
///
/// A candidate without a target only updates the context and keeps the
/// current state's timers and invocation alive. A candidate whose target is
/// the current state is an external self-transition: the state is exited and
/// entered again.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Context, Event};
/// use statecraft::definition::Transition;
/// use statecraft::{patch, state_enum};
///
/// state_enum! {
///     enum Door {
///         Open = "open",
///         Closed = "closed",
///     }
/// }
///
/// let close = Transition::to(Door::Closed)
///     .when(|ctx: &Context, _: &Event| ctx.bool("blocked") != Some(true))
///     .assign(|_: &Context, _: &Event| patch! { "closedBy" => "user" });
///
/// assert_eq!(close.target(), Some(&Door::Closed));
/// assert!(close.admits(&Context::new(), &Event::named("CLOSE")));
/// ```
#[derive(Clone, Debug)]
pub struct Transition<S: State> {
    pub(crate) guard: Option<Guard>,
    pub(crate) target: Option<S>,
    pub(crate) actions: Vec<Action>,
}

impl<S: State> Transition<S> {
    /// A transition entering `target`.
    pub fn to(target: S) -> Self {
        Self {
            guard: None,
            target: Some(target),
            actions: Vec::new(),
        }
    }

    /// A context-only transition that stays in the current state.
    pub fn internal() -> Self {
        Self {
            guard: None,
            target: None,
            actions: Vec::new(),
        }
    }

    /// Set the guard.
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Set the guard from a closure.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&Context, &Event) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    /// Append an action.
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Append an assign action from a closure.
    pub fn assign<F>(self, reducer: F) -> Self
    where
        F: Fn(&Context, &Event) -> Partial + Send + Sync + 'static,
    {
        self.action(Action::assign(reducer))
    }

    pub fn target(&self) -> Option<&S> {
        self.target.as_ref()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Whether the guard (if any) passes. An absent guard always passes.
    pub fn admits(&self, context: &Context, event: &Event) -> bool {
        self.guard.as_ref().is_none_or(|g| g.check(context, event))
    }
}

/// Pick the first candidate whose guard passes, in declaration order.
pub fn select<'a, S: State>(
    candidates: &'a [Transition<S>],
    context: &Context,
    event: &Event,
) -> Option<&'a Transition<S>> {
    candidates.iter().find(|c| c.admits(context, event))
}
