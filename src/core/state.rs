//! State contract and state identity.
//!
//! Every state driven by a [`StateMachine`](crate::StateMachine) implements
//! [`State`], which receives the machine's owner on each lifecycle hook.
//! States that never need the owner implement [`SimpleState`] instead and are
//! registered through the [`Ownerless`] adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::borrow::Borrow;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Stable, persistable identifier of a registered state.
///
/// Identifiers are opaque strings a host may store anywhere (save files,
/// database rows) and replay later against a machine with the same states
/// registered.
///
/// # Example
///
/// ```rust
/// use tickfsm::StateId;
///
/// let id = StateId::new("idle");
/// assert_eq!(id.as_str(), "idle");
/// assert_eq!(id.to_string(), "idle");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
    /// Create an identifier from an explicit name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier derived from the fully qualified type name of `T`.
    ///
    /// This is the default identity of a state. It is unique per type within
    /// a build, but may change when the type is renamed or moved.
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for StateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for StateId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// In-process key of a state type, used for registry lookups and factories.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StateKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl StateKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Upcast to [`Any`] so registered states can be handed back by type.
///
/// Implemented for every `'static` type; never implement it by hand.
#[doc(hidden)]
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Lifecycle contract of a state driven by an owner of type `O`.
///
/// All hooks default to no-ops. The machine guarantees:
///
/// - exactly one `on_enter` each time the state becomes current,
/// - exactly one `on_exit` when it stops being current, always before the
///   next state's `on_enter`,
/// - `on_update` / `on_fixed_update` once per corresponding machine tick while
///   current, after that tick's transition evaluation.
///
/// # Example
///
/// ```rust
/// use tickfsm::{State, StateId};
///
/// struct Mover {
///     speed: f32,
/// }
///
/// #[derive(Default)]
/// struct Walk;
///
/// impl State<Mover> for Walk {
///     fn id() -> StateId {
///         StateId::new("walk")
///     }
///
///     fn on_enter(&mut self, owner: &mut Mover) {
///         owner.speed = 1.5;
///     }
///
///     fn on_exit(&mut self, owner: &mut Mover) {
///         owner.speed = 0.0;
///     }
/// }
/// ```
pub trait State<O>: AsAny {
    /// Identifier used for persistence. Defaults to the type name; override
    /// it to keep saved data valid across refactors.
    fn id() -> StateId
    where
        Self: Sized,
    {
        StateId::of::<Self>()
    }

    fn on_enter(&mut self, _owner: &mut O) {}

    fn on_exit(&mut self, _owner: &mut O) {}

    fn on_update(&mut self, _owner: &mut O) {}

    fn on_fixed_update(&mut self, _owner: &mut O) {}

    /// Data to store with machine snapshots. `None`, the default, opts out.
    fn save_data(&self) -> Option<Value> {
        None
    }

    /// Receive data an earlier [`save_data`](State::save_data) produced. Runs
    /// during snapshot restore, without any lifecycle hook.
    fn load_data(&mut self, _data: Value) {}
}

/// Lifecycle contract of a state that never looks at the owner.
///
/// Register it through [`Ownerless`], which forwards every owner-aware hook
/// and drops the owner argument.
pub trait SimpleState: AsAny {
    fn id() -> StateId
    where
        Self: Sized,
    {
        StateId::of::<Self>()
    }

    fn on_enter(&mut self) {}

    fn on_exit(&mut self) {}

    fn on_update(&mut self) {}

    fn on_fixed_update(&mut self) {}

    fn save_data(&self) -> Option<Value> {
        None
    }

    fn load_data(&mut self, _data: Value) {}
}

/// Adapter that lets a [`SimpleState`] run in a machine with any owner type.
///
/// # Example
///
/// ```rust
/// use tickfsm::{Ownerless, SimpleState, StateMachine};
///
/// #[derive(Default)]
/// struct Blink {
///     ticks: u32,
/// }
///
/// impl SimpleState for Blink {
///     fn on_update(&mut self) {
///         self.ticks += 1;
///     }
/// }
///
/// let mut fsm = StateMachine::new(String::from("any owner"));
/// fsm.set_root_default::<Ownerless<Blink>>().unwrap();
/// fsm.update();
///
/// assert_eq!(fsm.state::<Ownerless<Blink>>().unwrap().ticks, 1);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ownerless<S>(pub S);

impl<S> Ownerless<S> {
    pub fn into_inner(self) -> S {
        self.0
    }
}

impl<S> Deref for Ownerless<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0
    }
}

impl<S> DerefMut for Ownerless<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.0
    }
}

impl<O, S: SimpleState + 'static> State<O> for Ownerless<S> {
    fn id() -> StateId {
        S::id()
    }

    fn on_enter(&mut self, _owner: &mut O) {
        self.0.on_enter();
    }

    fn on_exit(&mut self, _owner: &mut O) {
        self.0.on_exit();
    }

    fn on_update(&mut self, _owner: &mut O) {
        self.0.on_update();
    }

    fn on_fixed_update(&mut self, _owner: &mut O) {
        self.0.on_fixed_update();
    }

    fn save_data(&self) -> Option<Value> {
        self.0.save_data()
    }

    fn load_data(&mut self, data: Value) {
        self.0.load_data(data);
    }
}

/// Downcast a registered state back to its concrete type.
pub(crate) fn downcast_ref<'a, O: 'static, T: 'static>(
    state: &'a (dyn State<O> + 'static),
) -> Option<&'a T> {
    state.as_any().downcast_ref::<T>()
}

pub(crate) fn downcast_mut<'a, O: 'static, T: 'static>(
    state: &'a mut (dyn State<O> + 'static),
) -> Option<&'a mut T> {
    state.as_any_mut().downcast_mut::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        entered: u32,
        updated: u32,
    }

    impl State<u32> for Counter {
        fn on_enter(&mut self, owner: &mut u32) {
            self.entered += 1;
            *owner += 10;
        }

        fn on_update(&mut self, owner: &mut u32) {
            self.updated += 1;
            *owner += 1;
        }
    }

    #[derive(Default)]
    struct Named;

    impl State<()> for Named {
        fn id() -> StateId {
            StateId::new("named")
        }
    }

    #[derive(Default)]
    struct Lamp {
        lit: bool,
    }

    impl SimpleState for Lamp {
        fn id() -> StateId {
            StateId::new("lamp")
        }

        fn on_enter(&mut self) {
            self.lit = true;
        }

        fn on_exit(&mut self) {
            self.lit = false;
        }
    }

    #[test]
    fn default_id_is_type_name() {
        let id = <Counter as State<u32>>::id();
        assert!(id.as_str().ends_with("Counter"));
        assert_eq!(id, StateId::of::<Counter>());
    }

    #[test]
    fn explicit_id_overrides_type_name() {
        assert_eq!(<Named as State<()>>::id(), StateId::new("named"));
    }

    #[test]
    fn hooks_receive_owner() {
        let mut owner = 0u32;
        let mut state = Counter::default();

        state.on_enter(&mut owner);
        state.on_update(&mut owner);
        state.on_update(&mut owner);
        state.on_exit(&mut owner);

        assert_eq!(state.entered, 1);
        assert_eq!(state.updated, 2);
        assert_eq!(owner, 12);
    }

    #[test]
    fn ownerless_forwards_hooks_and_id() {
        let mut owner = String::from("ignored");
        let mut lamp = Ownerless(Lamp::default());

        State::<String>::on_enter(&mut lamp, &mut owner);
        assert!(lamp.lit);
        State::<String>::on_exit(&mut lamp, &mut owner);
        assert!(!lamp.lit);

        assert_eq!(<Ownerless<Lamp> as State<String>>::id(), StateId::new("lamp"));
        assert_eq!(owner, "ignored");
    }

    #[test]
    fn downcast_recovers_concrete_type() {
        let mut boxed: Box<dyn State<u32>> = Box::new(Counter::default());

        assert!(downcast_ref::<u32, Counter>(boxed.as_ref()).is_some());
        assert!(downcast_ref::<u32, Named>(boxed.as_ref()).is_none());

        if let Some(counter) = downcast_mut::<u32, Counter>(boxed.as_mut()) {
            counter.updated = 7;
        }
        assert_eq!(downcast_ref::<u32, Counter>(boxed.as_ref()).map(|c| c.updated), Some(7));
    }

    #[derive(Default)]
    struct Dial {
        level: u64,
    }

    impl SimpleState for Dial {
        fn save_data(&self) -> Option<Value> {
            Some(Value::from(self.level))
        }

        fn load_data(&mut self, data: Value) {
            if let Some(level) = data.as_u64() {
                self.level = level;
            }
        }
    }

    #[test]
    fn state_data_defaults_to_nothing() {
        let mut named = Named;
        assert_eq!(State::<()>::save_data(&named), None);
        State::<()>::load_data(&mut named, Value::from(1));
    }

    #[test]
    fn ownerless_forwards_state_data() {
        let dial = Ownerless(Dial { level: 3 });
        let saved = State::<()>::save_data(&dial).unwrap();

        let mut fresh = Ownerless(Dial::default());
        State::<()>::load_data(&mut fresh, saved);

        assert_eq!(fresh.level, 3);
    }

    #[test]
    fn state_key_distinguishes_types() {
        assert_eq!(StateKey::of::<Counter>(), StateKey::of::<Counter>());
        assert_ne!(StateKey::of::<Counter>(), StateKey::of::<Named>());
        assert!(StateKey::of::<Named>().type_name().ends_with("Named"));
    }

    #[test]
    fn state_id_serializes_as_plain_string() {
        let id = StateId::new("walk");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"walk\"");
        let back: StateId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
