//! Registry records: state nodes and the transitions leaving them.

use super::guard::Predicate;
use super::state::{State, StateId, StateKey};

/// Dense index of a node inside a machine's registry. Nodes are never
/// removed, so an index stays valid for the machine's lifetime.
pub(crate) type NodeIndex = usize;

/// Guarded edge towards a target node.
pub(crate) struct Transition<O> {
    target: NodeIndex,
    guard: Box<dyn Predicate<O>>,
}

impl<O> Transition<O> {
    pub(crate) fn new(target: NodeIndex, guard: Box<dyn Predicate<O>>) -> Self {
        Self { target, guard }
    }

    pub(crate) fn target(&self) -> NodeIndex {
        self.target
    }

    pub(crate) fn is_satisfied(&self, owner: &O) -> bool {
        self.guard.evaluate(owner)
    }
}

/// First transition whose guard holds, in insertion order.
pub(crate) fn first_satisfied<'a, O>(
    transitions: &'a [Transition<O>],
    owner: &O,
) -> Option<&'a Transition<O>> {
    transitions.iter().find(|t| t.is_satisfied(owner))
}

/// One registered state and its outgoing ordinary transitions.
pub(crate) struct StateNode<O> {
    pub(crate) id: StateId,
    pub(crate) key: StateKey,
    pub(crate) state: Box<dyn State<O>>,
    pub(crate) transitions: Vec<Transition<O>>,
}

impl<O> StateNode<O> {
    pub(crate) fn new(id: StateId, key: StateKey, state: Box<dyn State<O>>) -> Self {
        Self {
            id,
            key,
            state,
            transitions: Vec::new(),
        }
    }

    pub(crate) fn add_transition(&mut self, target: NodeIndex, guard: Box<dyn Predicate<O>>) {
        self.transitions.push(Transition::new(target, guard));
    }
}
