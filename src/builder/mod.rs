//! Builder API for ergonomic state machine construction.
//!
//! This module provides a fluent builder and a macro for declaring marker
//! states, so a machine can be assembled in one expression with its owner,
//! factory and logging configuration.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::StateMachineBuilder;
