//! Pluggable state construction.
//!
//! A machine asks its factory for an instance whenever it has to build a state
//! on its own: when [`create_state`](crate::StateMachine::create_state) is
//! called, or lazily when a root is set on a state nobody registered yet. The
//! factory is the place to inject dependencies such as handles copied from the
//! owner.

use crate::core::{State, StateKey};
use std::collections::HashMap;

/// Strategy for instantiating states.
///
/// Returning `None` means the factory does not know how to build the requested
/// type; the machine then falls back to `Default` where the call allows it, or
/// reports a construction error.
pub trait StateFactory<O> {
    fn create(&self, key: StateKey, owner: &O) -> Option<Box<dyn State<O>>>;
}

type Constructor<O> = Box<dyn Fn(&O) -> Box<dyn State<O>>>;

/// Constructor table keyed by state type. Empty unless filled by the host.
///
/// # Example
///
/// ```rust
/// use tickfsm::{DefaultStateFactory, State, StateMachine};
///
/// struct Player {
///     name: String,
/// }
///
/// struct Greeting {
///     text: String,
/// }
///
/// impl State<Player> for Greeting {}
///
/// let factory = DefaultStateFactory::new().register_with(|p: &Player| Greeting {
///     text: format!("hello {}", p.name),
/// });
///
/// let mut fsm = StateMachine::with_factory(Player { name: "ada".into() }, factory);
/// fsm.set_root::<Greeting>().unwrap();
///
/// assert_eq!(fsm.state::<Greeting>().unwrap().text, "hello ada");
/// ```
pub struct DefaultStateFactory<O> {
    constructors: HashMap<StateKey, Constructor<O>>,
}

impl<O: 'static> DefaultStateFactory<O> {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Build `T` with its zero-argument constructor.
    pub fn register<T>(self) -> Self
    where
        T: State<O> + Default,
    {
        self.register_with(|_owner: &O| T::default())
    }

    /// Build `T` with a constructor that may read the owner.
    pub fn register_with<T, F>(mut self, ctor: F) -> Self
    where
        T: State<O>,
        F: Fn(&O) -> T + 'static,
    {
        self.insert(ctor);
        self
    }

    /// In-place form of [`register_with`](Self::register_with).
    pub fn insert<T, F>(&mut self, ctor: F)
    where
        T: State<O>,
        F: Fn(&O) -> T + 'static,
    {
        let build: Constructor<O> =
            Box::new(move |owner: &O| -> Box<dyn State<O>> { Box::new(ctor(owner)) });
        self.constructors.insert(StateKey::of::<T>(), build);
    }

    pub fn knows(&self, key: &StateKey) -> bool {
        self.constructors.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl<O: 'static> Default for DefaultStateFactory<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: 'static> StateFactory<O> for DefaultStateFactory<O> {
    fn create(&self, key: StateKey, owner: &O) -> Option<Box<dyn State<O>>> {
        self.constructors.get(&key).map(|ctor| ctor(owner))
    }
}

/// Any closure with the right shape is a factory.
impl<O, F> StateFactory<O> for F
where
    F: Fn(StateKey, &O) -> Option<Box<dyn State<O>>>,
{
    fn create(&self, key: StateKey, owner: &O) -> Option<Box<dyn State<O>>> {
        self(key, owner)
    }
}
