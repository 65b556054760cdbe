//! Core State trait for machine states.
//!
//! Every state a machine definition refers to implements this trait. States
//! are plain values; all behaviour attached to them lives in the machine
//! definition, never in the state type itself.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for machine states.
///
/// # Required Traits
///
/// - `Clone`: states are copied into snapshots and history
/// - `Eq` + `Hash`: states key the definition's node table
/// - `Debug`: states must be debuggable for diagnostics
/// - `Serialize` + `Deserialize`: snapshots are serializable
///
/// Most machines generate the implementation with [`state_enum!`](crate::state_enum).
///
/// # Example
///
/// ```rust
/// use statecraft::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Light {
///     Green,
///     Yellow,
///     Red,
/// }
///
/// impl State for Light {
///     fn name(&self) -> &str {
///         match self {
///             Self::Green => "green",
///             Self::Yellow => "yellow",
///             Self::Red => "red",
///         }
///     }
/// }
///
/// assert_eq!(Light::Yellow.name(), "yellow");
/// ```
pub trait State:
    Clone + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Get the state's name for display, logging and synthetic event kinds.
    fn name(&self) -> &str;
}
