//! Snapshot and restore of machine position.
//!
//! A snapshot records *where* a machine is (root, current state, history) as
//! state identifiers, plus whatever data individual states opt to persist
//! through [`State::save_data`](crate::State::save_data). It does not record
//! the owner or the transition graph: the host rebuilds those and replays the
//! snapshot on a machine with the same states registered.

use crate::core::StateId;
use crate::error::FsmError;
use crate::machine::StateMachine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use uuid::Uuid;

pub mod error;

pub use error::{RestoreIssue, SnapshotError};

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable capture of a machine's position.
///
/// # Example
///
/// ```rust
/// use tickfsm::{Snapshot, State, StateMachine};
///
/// #[derive(Default)]
/// struct Idle;
/// impl State<()> for Idle {}
///
/// #[derive(Default)]
/// struct Walk;
/// impl State<()> for Walk {}
///
/// let mut fsm = StateMachine::unowned();
/// fsm.create_state::<Walk>().unwrap();
/// fsm.set_root_default::<Idle>().unwrap();
/// fsm.add_any_transition_when::<Walk, _>(|| true).unwrap();
/// fsm.update();
///
/// let json = fsm.snapshot().to_json().unwrap();
///
/// let mut restored = StateMachine::unowned();
/// restored.create_state::<Idle>().unwrap();
/// restored.create_state::<Walk>().unwrap();
/// restored.restore(&Snapshot::from_json(&json).unwrap()).unwrap();
///
/// assert!(restored.is_in_state::<Walk>());
/// assert!(restored.can_go_back());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: String,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    /// Root state, if one was set
    pub root: Option<StateId>,

    /// Current state, if one was set
    pub current: Option<StateId>,

    /// History, most recently left first
    pub history: Vec<StateId>,

    /// Per-state data as JSON text, so the binary codec can carry it too
    pub state_data: BTreeMap<StateId, String>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> Result<(), SnapshotError> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            })
        }
    }
}

impl<O: 'static> StateMachine<O> {
    /// Capture the root, current state and history identifiers.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4().to_string(),
            taken_at: Utc::now(),
            root: self.root_state_id().cloned(),
            current: self.current_state_id().cloned(),
            history: self.state_history_ids(),
            state_data: self
                .saved_state_data()
                .into_iter()
                .map(|(id, data)| (id, data.to_string()))
                .collect(),
        }
    }

    /// Check a snapshot against this machine, accumulating ALL problems
    /// instead of stopping at the first one.
    pub fn validate_snapshot(
        &self,
        snapshot: &Snapshot,
    ) -> Validation<(), NonEmptyVec<RestoreIssue>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<RestoreIssue>>> = Vec::new();

        checks.push(if snapshot.version == SNAPSHOT_VERSION {
            Validation::success(())
        } else {
            Validation::fail(RestoreIssue::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            })
        });

        if let Some(root) = &snapshot.root {
            checks.push(self.resolves(root, |id| RestoreIssue::UnknownRoot { id }));
        }

        if let Some(current) = &snapshot.current {
            checks.push(self.resolves(current, |id| RestoreIssue::UnknownCurrent { id }));
        }

        for (position, entry) in snapshot.history.iter().enumerate() {
            checks.push(self.resolves(entry, |id| RestoreIssue::UnknownHistoryEntry {
                position,
                id,
            }));
        }

        for (id, text) in &snapshot.state_data {
            checks.push(self.resolves(id, |id| RestoreIssue::UnknownStateData { id }));
            checks.push(match serde_json::from_str::<Value>(text) {
                Ok(_) => Validation::success(()),
                Err(e) => Validation::fail(RestoreIssue::MalformedStateData {
                    id: id.to_string(),
                    reason: e.to_string(),
                }),
            });
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Apply a snapshot: root and current are repointed without running any
    /// lifecycle hook, the history is rebuilt and saved state data is handed
    /// to the matching states. History entries and state data whose
    /// identifier matches no registered state are skipped.
    ///
    /// Fails without changing anything if the version is unsupported, the
    /// root or current state is unknown, or saved data is not valid JSON.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), FsmError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(FsmError::UnsupportedSnapshot {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }

        let data = snapshot
            .state_data
            .iter()
            .map(|(id, text)| {
                serde_json::from_str::<Value>(text)
                    .map(|value| (id, value))
                    .map_err(|e| FsmError::StateData {
                        id: id.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.set_position_by_ids(
            snapshot.root.as_ref().map(StateId::as_str),
            snapshot.current.as_ref().map(StateId::as_str),
        )?;
        self.set_state_history_by_ids(&snapshot.history);
        for (id, value) in data {
            self.load_state_data(id.as_str(), value);
        }
        Ok(())
    }

    fn resolves<F>(&self, id: &StateId, issue: F) -> Validation<(), NonEmptyVec<RestoreIssue>>
    where
        F: FnOnce(String) -> RestoreIssue,
    {
        if self.contains_id(id.as_str()) {
            Validation::success(())
        } else {
            Validation::fail(issue(id.to_string()))
        }
    }
}
