//! The state machine orchestrator.
//!
//! A [`StateMachine`] owns its host object (the owner), a registry of state
//! nodes, the ordinary and any-state transitions between them, the current
//! and root pointers, and the history stack used for backward navigation.
//! It never decides *when* to tick: the host calls [`StateMachine::update`]
//! and [`StateMachine::fixed_update`] from its own loop.

use crate::core::transition::{first_satisfied, NodeIndex, StateNode, Transition};
use crate::core::{
    downcast_mut, downcast_ref, FuncPredicate, Predicate, State, StateHistory, StateId, StateKey,
};
use crate::error::FsmError;
use crate::factory::{DefaultStateFactory, StateFactory};
use crate::logging::{LogCategory, Logger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How a state change came about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A guarded transition fired during `update`.
    Forward,
    /// `go_to_previous_state` popped the history.
    Back,
    /// `reset_to_root` jumped to the root and wiped the history.
    Reset,
}

/// Payload of the state-changed notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// State that was left, if any state was current.
    pub from: Option<StateId>,
    /// State that became current.
    pub to: StateId,
    pub kind: ChangeKind,
}

type Listener = Box<dyn FnMut(&StateChange)>;

/// Finite state machine driving an owner of type `O` through registered
/// states.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tickfsm::{State, StateMachine};
///
/// #[derive(Default)]
/// struct Idle;
/// impl State<()> for Idle {}
///
/// #[derive(Default)]
/// struct Walk;
/// impl State<()> for Walk {}
///
/// let key_down = Rc::new(Cell::new(false));
/// let pressed = Rc::clone(&key_down);
///
/// let mut fsm = StateMachine::unowned();
/// fsm.create_state::<Idle>().unwrap();
/// fsm.create_state::<Walk>().unwrap();
/// fsm.add_transition_when::<Idle, Walk, _>(move || pressed.get()).unwrap();
/// fsm.set_root::<Idle>().unwrap();
///
/// fsm.update();
/// assert!(fsm.is_in_state::<Idle>());
///
/// key_down.set(true);
/// fsm.update();
/// assert!(fsm.is_in_state::<Walk>());
/// assert!(fsm.can_go_back());
/// ```
pub struct StateMachine<O> {
    owner: O,
    nodes: Vec<StateNode<O>>,
    by_key: HashMap<StateKey, NodeIndex>,
    by_id: HashMap<StateId, NodeIndex>,
    any_transitions: Vec<Transition<O>>,
    root: Option<NodeIndex>,
    current: Option<NodeIndex>,
    history: StateHistory<NodeIndex>,
    factory: Box<dyn StateFactory<O>>,
    listeners: Vec<Listener>,
    logger: Logger,
}

/// Machine whose states need no owner context.
pub type SimpleStateMachine = StateMachine<()>;

impl StateMachine<()> {
    /// Machine bound to the unit owner.
    pub fn unowned() -> Self {
        Self::new(())
    }
}

impl<O: Default + 'static> Default for StateMachine<O> {
    fn default() -> Self {
        Self::new(O::default())
    }
}

impl<O: 'static> StateMachine<O> {
    /// Create a machine bound to `owner`, using an empty
    /// [`DefaultStateFactory`].
    pub fn new(owner: O) -> Self {
        Self::with_factory(owner, DefaultStateFactory::new())
    }

    /// Create a machine with a custom construction strategy.
    pub fn with_factory<F>(owner: O, factory: F) -> Self
    where
        F: StateFactory<O> + 'static,
    {
        Self::with_boxed_factory(owner, Box::new(factory))
    }

    pub(crate) fn with_boxed_factory(owner: O, factory: Box<dyn StateFactory<O>>) -> Self {
        Self {
            owner,
            nodes: Vec::new(),
            by_key: HashMap::new(),
            by_id: HashMap::new(),
            any_transitions: Vec::new(),
            root: None,
            current: None,
            history: StateHistory::new(),
            factory,
            listeners: Vec::new(),
            logger: Logger::default(),
        }
    }

    pub fn owner(&self) -> &O {
        &self.owner
    }

    pub fn owner_mut(&mut self) -> &mut O {
        &mut self.owner
    }

    pub fn into_owner(self) -> O {
        self.owner
    }

    /// Replace the construction strategy. Already registered states are kept.
    pub fn set_factory<F>(&mut self, factory: F)
    where
        F: StateFactory<O> + 'static,
    {
        self.factory = Box::new(factory);
    }

    pub fn log_filter(&self) -> LogCategory {
        self.logger.filter()
    }

    pub fn set_log_filter(&mut self, filter: LogCategory) {
        self.logger.set_filter(filter);
    }

    /// Install the diagnostic sink, replacing any previous one.
    pub fn set_log_sink<F>(&mut self, sink: F)
    where
        F: FnMut(&str, LogCategory) + 'static,
    {
        self.logger.set_sink(Box::new(sink));
    }

    pub fn clear_log_sink(&mut self) {
        self.logger.clear_sink();
    }

    /// Subscribe to completed state changes (forward, back and reset).
    /// Listeners run in subscription order after both lifecycle hooks.
    pub fn on_state_changed<F>(&mut self, listener: F)
    where
        F: FnMut(&StateChange) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Register `T`, or return the instance already registered.
    ///
    /// The factory is asked first so hosts can override construction; if it
    /// does not know `T`, `T::default()` is used.
    pub fn create_state<T>(&mut self) -> Result<&mut T, FsmError>
    where
        T: State<O> + Default,
    {
        let index = match self.index_of::<T>() {
            Some(index) => index,
            None => {
                let state = self
                    .build_with_factory::<T>()
                    .unwrap_or_else(|| Box::new(T::default()));
                self.register::<T>(state)?
            }
        };
        self.typed_mut::<T>(index)
    }

    /// Register `T` built by `ctor`, or return the instance already
    /// registered. `ctor` is not called in the latter case.
    pub fn create_state_with<T, F>(&mut self, ctor: F) -> Result<&mut T, FsmError>
    where
        T: State<O>,
        F: FnOnce(&O) -> T,
    {
        let index = match self.index_of::<T>() {
            Some(index) => index,
            None => {
                let state = Box::new(ctor(&self.owner));
                self.register::<T>(state)?
            }
        };
        self.typed_mut::<T>(index)
    }

    /// Register `T` built by the factory alone, or return the instance
    /// already registered.
    pub fn create_state_from_factory<T>(&mut self) -> Result<&mut T, FsmError>
    where
        T: State<O>,
    {
        let index = self.ensure_registered::<T>()?;
        self.typed_mut::<T>(index)
    }

    /// Add a transition from `From` to `To`, taken when `guard` holds while
    /// `From` is current. Transitions leaving the same state are evaluated in
    /// the order they were added.
    pub fn add_transition<From, To, P>(&mut self, guard: P) -> Result<(), FsmError>
    where
        From: State<O>,
        To: State<O>,
        P: Predicate<O> + 'static,
    {
        let from = self.require::<From>()?;
        let to = self.require::<To>()?;
        self.nodes[from].add_transition(to, Box::new(guard));
        Ok(())
    }

    /// [`add_transition`](Self::add_transition) with a plain closure guard.
    pub fn add_transition_when<From, To, F>(&mut self, guard: F) -> Result<(), FsmError>
    where
        From: State<O>,
        To: State<O>,
        F: Fn() -> bool + 'static,
    {
        self.add_transition::<From, To, _>(FuncPredicate::new(guard))
    }

    /// Add a transition to `To` that is checked from every state, after the
    /// current state's own transitions.
    pub fn add_any_transition<To, P>(&mut self, guard: P) -> Result<(), FsmError>
    where
        To: State<O>,
        P: Predicate<O> + 'static,
    {
        let to = self.require::<To>()?;
        self.any_transitions.push(Transition::new(to, Box::new(guard)));
        Ok(())
    }

    /// [`add_any_transition`](Self::add_any_transition) with a plain closure
    /// guard.
    pub fn add_any_transition_when<To, F>(&mut self, guard: F) -> Result<(), FsmError>
    where
        To: State<O>,
        F: Fn() -> bool + 'static,
    {
        self.add_any_transition::<To, _>(FuncPredicate::new(guard))
    }

    /// Make `T` the root and the current state, clearing the history.
    ///
    /// `T` is built through the factory if it is not registered yet. A state
    /// that was current before is exited first.
    pub fn set_root<T>(&mut self) -> Result<(), FsmError>
    where
        T: State<O>,
    {
        let index = self.ensure_registered::<T>()?;
        if let Some(previous) = self.current {
            self.exit(previous);
        }
        self.root = Some(index);
        self.history.clear();
        self.current = Some(index);
        self.enter(index);
        Ok(())
    }

    /// [`set_root`](Self::set_root) for default-constructible states, which
    /// are registered through [`create_state`](Self::create_state) if needed.
    pub fn set_root_default<T>(&mut self) -> Result<(), FsmError>
    where
        T: State<O> + Default,
    {
        self.create_state::<T>()?;
        self.set_root::<T>()
    }

    /// Evaluate transitions, perform at most one state change, then call
    /// `on_update` on whichever state is current.
    ///
    /// Ordinary transitions of the current state take precedence over
    /// any-state transitions; within each set the first added wins. A
    /// transition targeting the current state does nothing. Before a root is
    /// set this is a no-op.
    pub fn update(&mut self) -> Option<StateChange> {
        let current = self.current?;

        let target = first_satisfied(&self.nodes[current].transitions, &self.owner)
            .or_else(|| first_satisfied(&self.any_transitions, &self.owner))
            .map(Transition::target);

        let change = match target {
            Some(target) if target != current => {
                Some(self.change_state(target, ChangeKind::Forward))
            }
            _ => None,
        };

        if let Some(index) = self.current {
            self.nodes[index].state.on_update(&mut self.owner);
        }
        change
    }

    /// Forward a fixed-rate tick to the current state. No guards are checked.
    pub fn fixed_update(&mut self) {
        if let Some(index) = self.current {
            self.nodes[index].state.on_fixed_update(&mut self.owner);
        }
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// Return to the most recently left state without recording the move.
    ///
    /// With an empty history an error is logged and nothing changes.
    pub fn go_to_previous_state(&mut self) -> Option<StateChange> {
        let Some(previous) = self.history.pop() else {
            self.logger
                .log(LogCategory::ERROR, "Cannot go back: state history is empty");
            return None;
        };

        if Some(previous) == self.current {
            return None;
        }
        Some(self.change_state(previous, ChangeKind::Back))
    }

    /// Exit the current state, wipe the history and enter the root again.
    ///
    /// Without a root an error is logged and nothing changes.
    pub fn reset_to_root(&mut self) -> Option<StateChange> {
        let Some(root) = self.root else {
            self.logger
                .log(LogCategory::ERROR, "Cannot reset to root: no root state set");
            return None;
        };

        let previous = self.current;
        if let Some(previous) = previous {
            self.exit(previous);
        }
        self.history.clear();
        self.enter(root);
        self.current = Some(root);

        let change = StateChange {
            from: previous.map(|index| self.nodes[index].id.clone()),
            to: self.nodes[root].id.clone(),
            kind: ChangeKind::Reset,
        };
        self.notify(&change);
        Some(change)
    }

    /// Path from the oldest remembered state to the current one.
    pub fn full_state_route(&self) -> Vec<StateId> {
        let mut route: Vec<StateId> = self
            .history
            .oldest_first()
            .map(|&index| self.nodes[index].id.clone())
            .collect();

        if let Some(current) = self.current {
            if self.history.peek() != Some(&current) {
                route.push(self.nodes[current].id.clone());
            }
        }
        route
    }

    pub fn is_in_state<T: 'static>(&self) -> bool {
        self.current
            .is_some_and(|index| self.nodes[index].key == StateKey::of::<T>())
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.by_key.contains_key(&StateKey::of::<T>())
    }

    /// True if some registered state carries identifier `id`.
    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn state<T: 'static>(&self) -> Option<&T> {
        let index = self.index_of::<T>()?;
        downcast_ref::<O, T>(self.nodes[index].state.as_ref())
    }

    pub fn state_mut<T: 'static>(&mut self) -> Option<&mut T> {
        let index = self.index_of::<T>()?;
        downcast_mut::<O, T>(self.nodes[index].state.as_mut())
    }

    pub fn current_state(&self) -> Option<&dyn State<O>> {
        self.current.map(|index| self.nodes[index].state.as_ref())
    }

    /// Identifier `T` was registered under.
    pub fn id_of<T: 'static>(&self) -> Option<&StateId> {
        self.index_of::<T>().map(|index| &self.nodes[index].id)
    }

    pub fn has_root(&self) -> bool {
        self.root.is_some()
    }

    pub fn root_state_id(&self) -> Option<&StateId> {
        self.root.map(|index| &self.nodes[index].id)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Every registered state, in registration order.
    pub fn all_states(&self) -> impl Iterator<Item = &dyn State<O>> + '_ {
        self.nodes.iter().map(|node| node.state.as_ref())
    }

    /// Identifiers of every registered state, in registration order.
    pub fn all_state_ids(&self) -> impl Iterator<Item = &StateId> + '_ {
        self.nodes.iter().map(|node| &node.id)
    }

    pub fn current_state_id(&self) -> Option<&StateId> {
        self.current.map(|index| &self.nodes[index].id)
    }

    /// History identifiers, most recently left first.
    pub fn state_history_ids(&self) -> Vec<StateId> {
        self.history
            .newest_first()
            .map(|&index| self.nodes[index].id.clone())
            .collect()
    }

    /// Point the machine at the state registered under `id`.
    ///
    /// This is a raw reassignment for restoring persisted data: no lifecycle
    /// hook runs and no notification fires.
    pub fn set_current_state_by_id(&mut self, id: &str) -> Result<(), FsmError> {
        self.current = Some(self.index_of_id(id)?);
        Ok(())
    }

    /// Designate the state registered under `id` as root without entering it
    /// or touching the history.
    pub fn set_root_by_id(&mut self, id: &str) -> Result<(), FsmError> {
        self.root = Some(self.index_of_id(id)?);
        Ok(())
    }

    /// Repoint root and current together. `None` clears the pointer. Both
    /// identifiers are resolved before anything changes.
    pub(crate) fn set_position_by_ids(
        &mut self,
        root: Option<&str>,
        current: Option<&str>,
    ) -> Result<(), FsmError> {
        let root = root.map(|id| self.index_of_id(id)).transpose()?;
        let current = current.map(|id| self.index_of_id(id)).transpose()?;
        self.root = root;
        self.current = current;
        Ok(())
    }

    /// Data every state chooses to persist, keyed by identifier, in
    /// registration order.
    pub(crate) fn saved_state_data(&self) -> Vec<(StateId, serde_json::Value)> {
        self.nodes
            .iter()
            .filter_map(|node| node.state.save_data().map(|data| (node.id.clone(), data)))
            .collect()
    }

    /// Hand `data` to the state registered under `id`. Returns `false` if no
    /// such state exists.
    pub(crate) fn load_state_data(&mut self, id: &str, data: serde_json::Value) -> bool {
        match self.by_id.get(id).copied() {
            Some(index) => {
                self.nodes[index].state.load_data(data);
                true
            }
            None => false,
        }
    }

    /// Rebuild the history from identifiers given most recently left first,
    /// the order [`state_history_ids`](Self::state_history_ids) returns.
    /// Identifiers that match no registered state are skipped.
    pub fn set_state_history_by_ids<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resolved: Vec<NodeIndex> = ids
            .into_iter()
            .filter_map(|id| self.by_id.get(id.as_ref()).copied())
            .collect();
        self.history.replace_newest_first(resolved);
    }

    fn index_of<T: 'static>(&self) -> Option<NodeIndex> {
        self.by_key.get(&StateKey::of::<T>()).copied()
    }

    /// Index of the state registered under `id`, or a logged error.
    fn index_of_id(&mut self, id: &str) -> Result<NodeIndex, FsmError> {
        match self.by_id.get(id).copied() {
            Some(index) => Ok(index),
            None => Err(self.fail(FsmError::UnknownState { id: id.to_string() })),
        }
    }

    fn typed_mut<T: 'static>(&mut self, index: NodeIndex) -> Result<&mut T, FsmError> {
        let id = self.nodes[index].id.to_string();
        downcast_mut::<O, T>(self.nodes[index].state.as_mut())
            .ok_or(FsmError::Construction { state: id })
    }

    /// Index of `T`, or a logged precondition error.
    fn require<T: State<O>>(&mut self) -> Result<NodeIndex, FsmError> {
        match self.index_of::<T>() {
            Some(index) => Ok(index),
            None => Err(self.fail(FsmError::Unregistered {
                state: <T as State<O>>::id().to_string(),
            })),
        }
    }

    /// Index of `T`, registering a factory-built instance if needed.
    fn ensure_registered<T: State<O>>(&mut self) -> Result<NodeIndex, FsmError> {
        if let Some(index) = self.index_of::<T>() {
            return Ok(index);
        }
        match self.build_with_factory::<T>() {
            Some(state) => self.register::<T>(state),
            None => Err(self.fail(FsmError::Construction {
                state: <T as State<O>>::id().to_string(),
            })),
        }
    }

    /// Ask the factory for `T`. An instance of another type counts as no
    /// instance at all.
    fn build_with_factory<T: State<O>>(&self) -> Option<Box<dyn State<O>>> {
        self.factory
            .create(StateKey::of::<T>(), &self.owner)
            .filter(|state| downcast_ref::<O, T>(&**state).is_some())
    }

    fn register<T: State<O>>(&mut self, state: Box<dyn State<O>>) -> Result<NodeIndex, FsmError> {
        let id = <T as State<O>>::id();
        if self.by_id.contains_key(&id) {
            return Err(self.fail(FsmError::DuplicateId { id: id.to_string() }));
        }
        self.logger
            .log(LogCategory::STATE_CREATED, &format!("State created: {id}"));

        let index = self.nodes.len();
        let key = StateKey::of::<T>();
        self.nodes.push(StateNode::new(id.clone(), key, state));
        self.by_key.insert(key, index);
        self.by_id.insert(id.clone(), index);

        self.logger
            .log(LogCategory::STATE_REGISTERED, &format!("State registered: {id}"));
        Ok(index)
    }

    /// Leave the current state for `target` and notify listeners.
    fn change_state(&mut self, target: NodeIndex, kind: ChangeKind) -> StateChange {
        let previous = self.current;
        if kind == ChangeKind::Forward {
            if let Some(previous) = previous {
                self.history.push(previous);
            }
        }

        if let Some(previous) = previous {
            self.exit(previous);
        }
        self.enter(target);
        self.current = Some(target);

        let change = StateChange {
            from: previous.map(|index| self.nodes[index].id.clone()),
            to: self.nodes[target].id.clone(),
            kind,
        };
        self.notify(&change);
        change
    }

    fn enter(&mut self, index: NodeIndex) {
        self.nodes[index].state.on_enter(&mut self.owner);
        let message = format!("State entered: {}", self.nodes[index].id);
        self.logger.log(LogCategory::STATE_ENTER, &message);
    }

    fn exit(&mut self, index: NodeIndex) {
        self.nodes[index].state.on_exit(&mut self.owner);
        let message = format!("State exited: {}", self.nodes[index].id);
        self.logger.log(LogCategory::STATE_EXIT, &message);
    }

    fn notify(&mut self, change: &StateChange) {
        for listener in self.listeners.iter_mut() {
            listener(change);
        }
    }

    fn fail(&mut self, err: FsmError) -> FsmError {
        self.logger.log(LogCategory::ERROR, &err.to_string());
        err
    }
}

impl<O> fmt::Debug for StateMachine<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("states", &self.nodes.iter().map(|n| &n.id).collect::<Vec<_>>())
            .field("current", &self.current.map(|i| &self.nodes[i].id))
            .field("root", &self.root.map(|i| &self.nodes[i].id))
            .field("history_len", &self.history.len())
            .field("any_transitions", &self.any_transitions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Guard;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Calls = Rc<RefCell<Vec<String>>>;

    /// Owner that records every hook call in order.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        speed: u32,
    }

    macro_rules! recording_state {
        ($name:ident, $label:literal) => {
            #[derive(Default)]
            struct $name;

            impl State<Recorder> for $name {
                fn id() -> StateId {
                    StateId::new($label)
                }

                fn on_enter(&mut self, owner: &mut Recorder) {
                    owner.calls.push(format!("{}.enter", $label));
                }

                fn on_exit(&mut self, owner: &mut Recorder) {
                    owner.calls.push(format!("{}.exit", $label));
                }

                fn on_update(&mut self, owner: &mut Recorder) {
                    owner.calls.push(format!("{}.update", $label));
                }

                fn on_fixed_update(&mut self, owner: &mut Recorder) {
                    owner.calls.push(format!("{}.fixed", $label));
                }
            }
        };
    }

    recording_state!(Idle, "idle");
    recording_state!(Walk, "walk");
    recording_state!(Run, "run");

    fn flag() -> (Rc<Cell<bool>>, impl Fn() -> bool + 'static) {
        let flag = Rc::new(Cell::new(false));
        let captured = Rc::clone(&flag);
        (flag, move || captured.get())
    }

    fn machine() -> StateMachine<Recorder> {
        let mut fsm = StateMachine::new(Recorder::default());
        fsm.create_state::<Idle>().unwrap();
        fsm.create_state::<Walk>().unwrap();
        fsm.create_state::<Run>().unwrap();
        fsm
    }

    fn take_calls(fsm: &mut StateMachine<Recorder>) -> Vec<String> {
        std::mem::take(&mut fsm.owner_mut().calls)
    }

    #[test]
    fn create_state_is_idempotent() {
        let built = Rc::new(Cell::new(0));
        let counter = Rc::clone(&built);
        let mut fsm = StateMachine::new(Recorder::default());

        fsm.create_state_with(|_| {
            counter.set(counter.get() + 1);
            Idle
        })
        .unwrap();
        let counter = Rc::clone(&built);
        fsm.create_state_with(|_| {
            counter.set(counter.get() + 1);
            Idle
        })
        .unwrap();
        fsm.create_state::<Idle>().unwrap();

        assert_eq!(built.get(), 1);
        assert_eq!(fsm.all_states().count(), 1);
    }

    #[test]
    fn add_transition_requires_registered_states() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&lines);
        let mut fsm = StateMachine::new(Recorder::default());
        fsm.set_log_sink(move |msg, category| sink.borrow_mut().push((msg.to_string(), category)));
        fsm.create_state::<Idle>().unwrap();
        lines.borrow_mut().clear();

        let err = fsm.add_transition_when::<Idle, Walk, _>(|| true).unwrap_err();
        assert_eq!(
            err,
            FsmError::Unregistered {
                state: "walk".to_string()
            }
        );
        {
            let lines = lines.borrow();
            assert_eq!(lines.len(), 1);
            assert_eq!(lines[0].1, LogCategory::ERROR);
            assert!(lines[0].0.contains("must be registered before transitions"));
        }

        let err = fsm.add_any_transition_when::<Run, _>(|| true).unwrap_err();
        assert!(matches!(err, FsmError::Unregistered { .. }));
        assert_eq!(lines.borrow().len(), 2);
        assert_eq!(lines.borrow()[1].1, LogCategory::ERROR);
    }

    #[test]
    fn set_root_enters_root() {
        let mut fsm = machine();
        fsm.set_root::<Idle>().unwrap();

        assert!(fsm.is_in_state::<Idle>());
        assert!(fsm.has_root());
        assert_eq!(take_calls(&mut fsm), vec!["idle.enter"]);
    }

    #[test]
    fn set_root_on_unbuildable_state_fails() {
        struct Remote;
        impl State<Recorder> for Remote {}

        let mut fsm = StateMachine::new(Recorder::default());
        let err = fsm.set_root::<Remote>().unwrap_err();

        assert!(matches!(err, FsmError::Construction { .. }));
        assert!(!fsm.has_root());
    }

    #[test]
    fn update_before_root_is_a_no_op() {
        let mut fsm = machine();
        fsm.add_any_transition_when::<Walk, _>(|| true).unwrap();

        assert!(fsm.update().is_none());
        fsm.fixed_update();
        assert!(fsm.owner().calls.is_empty());
    }

    #[test]
    fn update_without_firing_only_updates_current() {
        let mut fsm = machine();
        let (_go, guard) = flag();
        fsm.add_transition_when::<Idle, Walk, _>(guard).unwrap();
        fsm.set_root::<Idle>().unwrap();
        take_calls(&mut fsm);

        assert!(fsm.update().is_none());
        assert_eq!(take_calls(&mut fsm), vec!["idle.update"]);
        assert!(!fsm.can_go_back());
    }

    #[test]
    fn firing_transition_exits_enters_then_updates_new_state() {
        let mut fsm = machine();
        let (go, guard) = flag();
        fsm.add_transition_when::<Idle, Walk, _>(guard).unwrap();
        fsm.set_root::<Idle>().unwrap();
        take_calls(&mut fsm);

        go.set(true);
        let change = fsm.update().expect("transition should fire");

        assert_eq!(
            take_calls(&mut fsm),
            vec!["idle.exit", "walk.enter", "walk.update"]
        );
        assert_eq!(change.from, Some(StateId::new("idle")));
        assert_eq!(change.to, StateId::new("walk"));
        assert_eq!(change.kind, ChangeKind::Forward);
        assert!(fsm.is_in_state::<Walk>());
        assert!(fsm.can_go_back());
    }

    #[test]
    fn first_added_transition_wins() {
        let mut fsm = machine();
        fsm.add_transition_when::<Idle, Run, _>(|| true).unwrap();
        fsm.add_transition_when::<Idle, Walk, _>(|| true).unwrap();
        fsm.set_root::<Idle>().unwrap();

        fsm.update();
        assert!(fsm.is_in_state::<Run>());
    }

    #[test]
    fn ordinary_transitions_take_precedence_over_any() {
        let mut fsm = machine();
        fsm.add_any_transition_when::<Run, _>(|| true).unwrap();
        fsm.add_transition_when::<Idle, Walk, _>(|| true).unwrap();
        fsm.set_root::<Idle>().unwrap();

        fsm.update();
        assert!(fsm.is_in_state::<Walk>());

        // Walk has no ordinary transitions, so the any-transition applies.
        fsm.update();
        assert!(fsm.is_in_state::<Run>());
    }

    #[test]
    fn transition_to_current_state_is_ignored() {
        let mut fsm = machine();
        fsm.add_any_transition_when::<Idle, _>(|| true).unwrap();
        fsm.set_root::<Idle>().unwrap();
        take_calls(&mut fsm);

        assert!(fsm.update().is_none());
        assert_eq!(take_calls(&mut fsm), vec!["idle.update"]);
        assert!(!fsm.can_go_back());
    }

    #[test]
    fn guards_can_read_the_owner() {
        let mut fsm = machine();
        fsm.add_transition::<Idle, Run, _>(Guard::new(|r: &Recorder| r.speed > 5))
            .unwrap();
        fsm.set_root::<Idle>().unwrap();

        fsm.update();
        assert!(fsm.is_in_state::<Idle>());

        fsm.owner_mut().speed = 9;
        fsm.update();
        assert!(fsm.is_in_state::<Run>());
    }

    #[test]
    fn fixed_update_skips_guards() {
        let mut fsm = machine();
        fsm.add_transition_when::<Idle, Walk, _>(|| true).unwrap();
        fsm.set_root::<Idle>().unwrap();
        take_calls(&mut fsm);

        fsm.fixed_update();
        assert!(fsm.is_in_state::<Idle>());
        assert_eq!(take_calls(&mut fsm), vec!["idle.fixed"]);
    }

    #[test]
    fn go_back_returns_to_previous_state_without_pushing() {
        let mut fsm = machine();
        let (go, guard) = flag();
        fsm.add_transition_when::<Idle, Walk, _>(guard).unwrap();
        fsm.set_root::<Idle>().unwrap();
        go.set(true);
        fsm.update();
        go.set(false);
        take_calls(&mut fsm);

        let change = fsm.go_to_previous_state().expect("history has an entry");

        assert_eq!(change.kind, ChangeKind::Back);
        assert!(fsm.is_in_state::<Idle>());
        assert!(!fsm.can_go_back());
        assert_eq!(take_calls(&mut fsm), vec!["walk.exit", "idle.enter"]);
    }

    #[test]
    fn go_back_with_empty_history_logs_and_does_nothing() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&lines);
        let mut fsm = machine();
        fsm.set_log_sink(move |msg, cat| sink.borrow_mut().push((msg.to_string(), cat)));
        fsm.set_root::<Idle>().unwrap();

        assert!(fsm.go_to_previous_state().is_none());
        assert!(fsm.is_in_state::<Idle>());
        assert!(lines
            .borrow()
            .iter()
            .any(|(msg, cat)| *cat == LogCategory::ERROR && msg.contains("history is empty")));
    }

    #[test]
    fn reset_to_root_clears_history_and_reenters_root() {
        let mut fsm = machine();
        fsm.add_transition_when::<Idle, Walk, _>(|| true).unwrap();
        fsm.add_transition_when::<Walk, Run, _>(|| true).unwrap();
        fsm.set_root::<Idle>().unwrap();
        fsm.update();
        fsm.update();
        assert_eq!(fsm.history_len(), 2);
        take_calls(&mut fsm);

        let change = fsm.reset_to_root().expect("root is set");

        assert_eq!(change.kind, ChangeKind::Reset);
        assert_eq!(change.from, Some(StateId::new("run")));
        assert!(fsm.is_in_state::<Idle>());
        assert!(!fsm.can_go_back());
        assert_eq!(take_calls(&mut fsm), vec!["run.exit", "idle.enter"]);
    }

    #[test]
    fn reset_without_root_is_a_logged_no_op() {
        let errors = Rc::new(Cell::new(0));
        let counter = Rc::clone(&errors);
        let mut fsm = machine();
        fsm.set_log_sink(move |_, cat| {
            if cat == LogCategory::ERROR {
                counter.set(counter.get() + 1);
            }
        });

        assert!(fsm.reset_to_root().is_none());
        assert_eq!(errors.get(), 1);
        assert!(fsm.current_state_id().is_none());
    }

    #[test]
    fn listeners_see_every_change_in_order() {
        let seen: Calls = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&seen);
        let second = Rc::clone(&seen);
        let mut fsm = machine();
        fsm.on_state_changed(move |c| first.borrow_mut().push(format!("a:{}", c.to)));
        fsm.on_state_changed(move |c| second.borrow_mut().push(format!("b:{}", c.to)));
        fsm.add_transition_when::<Idle, Walk, _>(|| true).unwrap();
        fsm.set_root::<Idle>().unwrap();

        fsm.update();
        fsm.go_to_previous_state();
        fsm.reset_to_root();

        assert_eq!(
            *seen.borrow(),
            vec!["a:walk", "b:walk", "a:idle", "b:idle", "a:idle", "b:idle"]
        );
    }

    #[test]
    fn full_route_lists_history_then_current() {
        let mut fsm = machine();
        fsm.add_transition_when::<Idle, Walk, _>(|| true).unwrap();
        fsm.add_transition_when::<Walk, Run, _>(|| true).unwrap();
        assert!(fsm.full_state_route().is_empty());

        fsm.set_root::<Idle>().unwrap();
        fsm.update();
        fsm.update();

        let route: Vec<String> = fsm
            .full_state_route()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(route, vec!["idle", "walk", "run"]);
    }

    #[test]
    fn history_ids_are_newest_first_and_restorable() {
        let mut fsm = machine();
        fsm.add_transition_when::<Idle, Walk, _>(|| true).unwrap();
        fsm.add_transition_when::<Walk, Run, _>(|| true).unwrap();
        fsm.set_root::<Idle>().unwrap();
        fsm.update();
        fsm.update();

        let ids = fsm.state_history_ids();
        assert_eq!(ids, vec![StateId::new("walk"), StateId::new("idle")]);

        let mut other = machine();
        other.set_root::<Idle>().unwrap();
        take_calls(&mut other);
        other.set_current_state_by_id("run").unwrap();
        other.set_state_history_by_ids(&ids);

        assert!(other.is_in_state::<Run>());
        assert_eq!(other.state_history_ids(), ids);
        assert!(other.owner().calls.is_empty(), "restoration must not run hooks");

        other.go_to_previous_state();
        assert!(other.is_in_state::<Walk>());
    }

    #[test]
    fn unknown_ids_are_rejected_or_skipped() {
        let mut fsm = machine();
        fsm.set_root::<Idle>().unwrap();

        let err = fsm.set_current_state_by_id("swim").unwrap_err();
        assert_eq!(
            err,
            FsmError::UnknownState {
                id: "swim".to_string()
            }
        );
        assert!(fsm.is_in_state::<Idle>());

        fsm.set_state_history_by_ids(["swim", "walk", "fly"]);
        assert_eq!(fsm.state_history_ids(), vec![StateId::new("walk")]);
    }

    #[test]
    fn duplicate_ids_are_refused() {
        #[derive(Debug, Default)]
        struct Impostor;
        impl State<Recorder> for Impostor {
            fn id() -> StateId {
                StateId::new("idle")
            }
        }

        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        let mut fsm = machine();
        fsm.set_log_filter(LogCategory::ERROR);
        fsm.set_log_sink(move |msg, _| sink.borrow_mut().push(msg.to_string()));
        let err = fsm.create_state::<Impostor>().unwrap_err();

        assert_eq!(*errors.borrow(), vec![err.to_string()]);

        assert_eq!(
            err,
            FsmError::DuplicateId {
                id: "idle".to_string()
            }
        );
        assert!(!fsm.is_registered::<Impostor>());
    }

    #[test]
    fn factory_overrides_default_construction() {
        #[derive(Default)]
        struct Charge {
            power: u32,
        }
        impl State<Recorder> for Charge {}

        let factory =
            DefaultStateFactory::new().register_with(|r: &Recorder| Charge { power: r.speed * 2 });
        let mut fsm = StateMachine::with_factory(
            Recorder {
                speed: 4,
                ..Recorder::default()
            },
            factory,
        );

        assert_eq!(fsm.create_state::<Charge>().unwrap().power, 8);
    }

    #[test]
    fn factory_returning_wrong_type_is_a_construction_error() {
        #[derive(Debug)]
        struct Wanted;
        impl State<Recorder> for Wanted {}

        let factory = |_key: StateKey, _owner: &Recorder| -> Option<Box<dyn State<Recorder>>> {
            Some(Box::new(Idle))
        };
        let mut fsm = StateMachine::with_factory(Recorder::default(), factory);

        let err = fsm.create_state_from_factory::<Wanted>().unwrap_err();
        assert!(matches!(err, FsmError::Construction { .. }));
    }

    #[test]
    fn log_filter_limits_categories() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&lines);
        let mut fsm = StateMachine::new(Recorder::default());
        fsm.set_log_filter(LogCategory::STATE_ENTER | LogCategory::STATE_EXIT);
        fsm.set_log_sink(move |msg, cat| sink.borrow_mut().push((msg.to_string(), cat)));

        fsm.create_state::<Idle>().unwrap();
        fsm.create_state::<Walk>().unwrap();
        fsm.add_transition_when::<Idle, Walk, _>(|| true).unwrap();
        fsm.set_root::<Idle>().unwrap();
        fsm.update();

        let lines = lines.borrow();
        assert_eq!(
            *lines,
            vec![
                ("State entered: idle".to_string(), LogCategory::STATE_ENTER),
                ("State exited: idle".to_string(), LogCategory::STATE_EXIT),
                ("State entered: walk".to_string(), LogCategory::STATE_ENTER),
            ]
        );
    }

    #[test]
    fn typed_access_reaches_registered_instances() {
        #[derive(Default)]
        struct Jump {
            height: u32,
        }
        impl State<Recorder> for Jump {
            fn on_enter(&mut self, _owner: &mut Recorder) {
                self.height += 1;
            }
        }

        let mut fsm = StateMachine::new(Recorder::default());
        fsm.set_root_default::<Jump>().unwrap();

        assert_eq!(fsm.state::<Jump>().map(|j| j.height), Some(1));
        fsm.state_mut::<Jump>().unwrap().height = 10;
        assert_eq!(fsm.state::<Jump>().map(|j| j.height), Some(10));
        assert!(fsm.state::<Idle>().is_none());
        assert_eq!(fsm.id_of::<Jump>(), fsm.current_state_id());
    }

    #[test]
    fn resetting_root_exits_previous_current() {
        let mut fsm = machine();
        fsm.set_root::<Idle>().unwrap();
        fsm.set_root::<Walk>().unwrap();

        assert_eq!(take_calls(&mut fsm), vec!["idle.enter", "idle.exit", "walk.enter"]);
        assert_eq!(fsm.root_state_id(), Some(&StateId::new("walk")));
    }

    #[test]
    fn unowned_machine_runs_unit_states() {
        #[derive(Default)]
        struct Solo;
        impl State<()> for Solo {}

        let mut fsm = SimpleStateMachine::unowned();
        fsm.set_root_default::<Solo>().unwrap();
        fsm.update();

        assert!(fsm.is_in_state::<Solo>());
        assert_eq!(fsm.all_state_ids().count(), 1);
    }
}
