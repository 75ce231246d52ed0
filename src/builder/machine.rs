//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::core::State;
use crate::error::FsmError;
use crate::factory::StateFactory;
use crate::logging::{LogCategory, LogSink};
use crate::machine::StateMachine;

/// Builder for constructing state machines with a fluent API.
///
/// # Example
///
/// ```rust
/// use tickfsm::builder::StateMachineBuilder;
/// use tickfsm::{LogCategory, State};
///
/// #[derive(Default)]
/// struct Patrol;
/// impl State<u32> for Patrol {}
///
/// let fsm = StateMachineBuilder::new()
///     .owner(3u32)
///     .log_filter(LogCategory::ERROR)
///     .root::<Patrol>()
///     .build()
///     .unwrap();
///
/// assert!(fsm.is_in_state::<Patrol>());
/// assert_eq!(*fsm.owner(), 3);
/// ```
pub struct StateMachineBuilder<O: 'static> {
    owner: Option<O>,
    factory: Option<Box<dyn StateFactory<O>>>,
    log_filter: LogCategory,
    log_sink: Option<LogSink>,
    states: Vec<Registration<O>>,
}

type Registration<O> = Box<dyn FnOnce(&mut StateMachine<O>) -> Result<(), FsmError>>;

impl<O: 'static> StateMachineBuilder<O> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            owner: None,
            factory: None,
            log_filter: LogCategory::ALL,
            log_sink: None,
            states: Vec::new(),
        }
    }

    /// Set the owner (required).
    pub fn owner(mut self, owner: O) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Override the construction strategy.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: StateFactory<O> + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn log_filter(mut self, filter: LogCategory) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn log_sink<F>(mut self, sink: F) -> Self
    where
        F: FnMut(&str, LogCategory) + 'static,
    {
        self.log_sink = Some(Box::new(sink));
        self
    }

    /// Register a default-constructible state when the machine is built.
    pub fn state<T>(mut self) -> Self
    where
        T: State<O> + Default,
    {
        self.states.push(Box::new(|fsm: &mut StateMachine<O>| {
            fsm.create_state::<T>().map(|_| ())
        }));
        self
    }

    /// Register `T` and make it the root when the machine is built.
    pub fn root<T>(mut self) -> Self
    where
        T: State<O> + Default,
    {
        self.states
            .push(Box::new(|fsm: &mut StateMachine<O>| fsm.set_root_default::<T>()));
        self
    }

    /// Build the state machine.
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<StateMachine<O>, BuildError> {
        let owner = self.owner.ok_or(BuildError::MissingOwner)?;

        let mut machine = match self.factory {
            Some(factory) => StateMachine::with_boxed_factory(owner, factory),
            None => StateMachine::new(owner),
        };
        machine.set_log_filter(self.log_filter);
        if let Some(sink) = self.log_sink {
            machine.set_log_sink(sink);
        }

        for register in self.states {
            register(&mut machine)?;
        }

        Ok(machine)
    }
}

impl<O: 'static> Default for StateMachineBuilder<O> {
    fn default() -> Self {
        Self::new()
    }
}
