//! Build errors for the state machine builder.

use crate::error::FsmError;
use thiserror::Error;

/// Errors that can occur when building a state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Owner not specified. Call .owner(value) before .build()")]
    MissingOwner,

    #[error("State registration failed: {0}")]
    Registration(#[from] FsmError),
}
