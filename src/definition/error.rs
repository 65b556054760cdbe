//! Configuration errors detected while building a machine definition.

use thiserror::Error;

/// A single problem found in a machine definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Initial state '{state}' has no state node")]
    UnknownInitialState { state: String },

    #[error("State '{state}' is declared more than once")]
    DuplicateState { state: String },

    #[error("State '{state}' declares more than one handler for '{event}'")]
    DuplicateHandler { state: String, event: String },

    #[error("State '{state}' declares more than one invocation")]
    DuplicateInvocation { state: String },

    #[error("State '{state}' handles reserved event kind '{event}'")]
    ReservedEventKind { state: String, event: String },

    #[error("Transition from '{state}' on '{event}' targets '{target}', which has no state node")]
    DanglingTarget {
        state: String,
        event: String,
        target: String,
    },
}

/// Every problem found while validating a machine definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("machine '{machine}' is invalid: {}", summarize(.issues))]
pub struct InvalidDefinition {
    pub machine: String,
    pub issues: Vec<DefinitionError>,
}

fn summarize(issues: &[DefinitionError]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl InvalidDefinition {
    pub fn contains(&self, issue: &DefinitionError) -> bool {
        self.issues.contains(issue)
    }
}
