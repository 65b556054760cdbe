//! The imperative shell: interpreters running machine definitions.
//!
//! An [`Interpreter`] owns one live snapshot and processes events strictly
//! one at a time. Invoked services and delayed transitions are scoped to
//! the state entry that started them; leaving the state cancels them and
//! any result they already produced is discarded.

mod error;
mod inspect;
mod interpreter;
mod invoke;
mod mail;
mod options;
mod scheduler;

pub use error::InterpreterError;
pub use inspect::{HistoryRecorder, Inspector, DEFAULT_HISTORY_LIMIT};
pub use interpreter::{Interpreter, Subscription};
pub use options::InterpreterOptions;
