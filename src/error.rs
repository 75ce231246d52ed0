//! Errors raised by the state machine.

use thiserror::Error;

/// Errors that can occur when configuring or restoring a state machine.
///
/// These are programming errors for the most part: they are expected to
/// surface during development rather than be recovered from at runtime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FsmError {
    #[error("States must be registered before transitions: '{state}' is not registered")]
    Unregistered { state: String },

    #[error("Cannot construct state '{state}': no constructor registered in the factory")]
    Construction { state: String },

    #[error("No registered state has identifier '{id}'")]
    UnknownState { id: String },

    #[error("State identifier '{id}' is already used by another registered state")]
    DuplicateId { id: String },

    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedSnapshot { found: u32, supported: u32 },

    #[error("Saved data for state '{id}' is not valid JSON: {reason}")]
    StateData { id: String, reason: String },
}
