//! Tickfsm: an engine-agnostic finite state machine runtime
//!
//! Tickfsm drives a host object (the *owner*) through a set of states. The
//! host owns the loop: it calls [`StateMachine::update`] once per frame and
//! [`StateMachine::fixed_update`] once per fixed step, and the machine does the
//! rest. States are plain Rust types; each type is registered at most once.
//!
//! # Core Concepts
//!
//! - **State**: lifecycle hooks (`on_enter`, `on_exit`, `on_update`,
//!   `on_fixed_update`) via the [`State`] trait, or [`SimpleState`] for states
//!   that never touch the owner
//! - **Transitions**: guarded edges checked on every update, plus any-state
//!   transitions that apply from everywhere
//! - **History**: a stack of previously left states, used by
//!   [`StateMachine::go_to_previous_state`]
//! - **Snapshots**: serializable captures of root, current state and history
//!
//! # Example
//!
//! ```rust
//! use tickfsm::{Guard, State, StateMachine};
//!
//! #[derive(Default)]
//! struct Player {
//!     walk_pressed: bool,
//!     speed: f32,
//! }
//!
//! #[derive(Default)]
//! struct Idle;
//! impl State<Player> for Idle {}
//!
//! #[derive(Default)]
//! struct Walk;
//! impl State<Player> for Walk {
//!     fn on_enter(&mut self, player: &mut Player) {
//!         player.speed = 2.5;
//!     }
//!
//!     fn on_exit(&mut self, player: &mut Player) {
//!         player.speed = 0.0;
//!     }
//! }
//!
//! let mut fsm = StateMachine::new(Player::default());
//! fsm.create_state::<Idle>().unwrap();
//! fsm.create_state::<Walk>().unwrap();
//! fsm.add_transition::<Idle, Walk, _>(Guard::new(|p: &Player| p.walk_pressed))
//!     .unwrap();
//! fsm.add_transition::<Walk, Idle, _>(Guard::new(|p: &Player| !p.walk_pressed))
//!     .unwrap();
//! fsm.set_root::<Idle>().unwrap();
//!
//! fsm.owner_mut().walk_pressed = true;
//! fsm.update();
//! assert!(fsm.is_in_state::<Walk>());
//! assert_eq!(fsm.owner().speed, 2.5);
//!
//! fsm.go_to_previous_state();
//! assert!(fsm.is_in_state::<Idle>());
//! assert_eq!(fsm.owner().speed, 0.0);
//! ```

pub mod builder;
pub mod core;
mod error;
pub mod factory;
mod logging;
mod machine;
pub mod snapshot;

// Re-export commonly used types
pub use crate::core::{
    FuncPredicate, Guard, Not, Ownerless, Predicate, SimpleState, State, StateHistory, StateId,
    StateKey,
};
pub use error::FsmError;
pub use factory::{DefaultStateFactory, StateFactory};
pub use logging::{LogCategory, LogSink};
pub use machine::{ChangeKind, SimpleStateMachine, StateChange, StateMachine};
pub use snapshot::{RestoreIssue, Snapshot, SnapshotError, SNAPSHOT_VERSION};
