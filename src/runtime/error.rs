//! Errors reported by interpreter handles.

use thiserror::Error;

/// Failure to reach a running interpreter.
///
/// Guard rejections, unhandled events and service failures are not errors:
/// they are resolved inside the machine. The only way a call on a handle can
/// fail is when the interpreter task is gone.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("Interpreter for machine '{machine}' is stopped")]
    Stopped { machine: String },
}
