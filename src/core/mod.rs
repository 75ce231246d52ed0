//! Core state machine building blocks.
//!
//! This module contains the pieces the machine is assembled from:
//! - The state contract via the `State` and `SimpleState` traits
//! - Guard predicates for transition control
//! - The backward-navigation history stack
//! - Registry nodes and transitions (crate internal)

mod guard;
mod history;
mod state;
pub(crate) mod transition;

pub use guard::{FuncPredicate, Guard, Not, Predicate};
pub use history::StateHistory;
pub use state::{AsAny, Ownerless, SimpleState, State, StateId, StateKey};

pub(crate) use state::{downcast_mut, downcast_ref};
