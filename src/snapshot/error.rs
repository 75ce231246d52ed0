//! Snapshot error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Serialization to JSON or binary format failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Snapshot version is not supported by this version
    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// A single problem found while checking a snapshot against a machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RestoreIssue {
    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Root state '{id}' is not registered")]
    UnknownRoot { id: String },

    #[error("Current state '{id}' is not registered")]
    UnknownCurrent { id: String },

    #[error("History entry {position} ('{id}') is not registered")]
    UnknownHistoryEntry { position: usize, id: String },

    #[error("Saved data belongs to unregistered state '{id}'")]
    UnknownStateData { id: String },

    #[error("Saved data for state '{id}' is not valid JSON: {reason}")]
    MalformedStateData { id: String, reason: String },
}
