//! Guard predicates for controlling state transitions.
//!
//! A transition fires on the first tick its guard evaluates to `true`. Guards
//! are expected to be side-effect free and non-blocking; the machine may
//! evaluate many of them per tick.

use std::fmt;

/// Boolean capability used as a transition guard.
///
/// The owner is passed read-only so guards can inspect it directly instead of
/// sharing state through captured handles. Implementations that do not care
/// about the owner simply ignore the argument.
pub trait Predicate<O> {
    fn evaluate(&self, owner: &O) -> bool;
}

/// Predicate backed by a closure that takes no arguments.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tickfsm::{FuncPredicate, Predicate};
///
/// let pressed = Rc::new(Cell::new(false));
/// let flag = Rc::clone(&pressed);
/// let guard = FuncPredicate::new(move || flag.get());
///
/// assert!(!Predicate::<()>::evaluate(&guard, &()));
/// pressed.set(true);
/// assert!(Predicate::<()>::evaluate(&guard, &()));
/// ```
pub struct FuncPredicate {
    func: Box<dyn Fn() -> bool>,
}

impl FuncPredicate {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        Self {
            func: Box::new(func),
        }
    }
}

impl<O> Predicate<O> for FuncPredicate {
    fn evaluate(&self, _owner: &O) -> bool {
        (self.func)()
    }
}

impl fmt::Debug for FuncPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FuncPredicate")
    }
}

/// Predicate that reads the machine owner.
///
/// # Example
///
/// ```rust
/// use tickfsm::{Guard, Predicate};
///
/// struct Player {
///     stamina: u32,
/// }
///
/// let can_sprint = Guard::new(|p: &Player| p.stamina > 10);
///
/// assert!(can_sprint.evaluate(&Player { stamina: 50 }));
/// assert!(!can_sprint.evaluate(&Player { stamina: 3 }));
/// ```
pub struct Guard<O> {
    predicate: Box<dyn Fn(&O) -> bool>,
}

impl<O> Guard<O> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&O) -> bool + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }
}

impl<O> Predicate<O> for Guard<O> {
    fn evaluate(&self, owner: &O) -> bool {
        (self.predicate)(owner)
    }
}

impl<O> fmt::Debug for Guard<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard")
    }
}

/// Inverts another predicate.
#[derive(Debug)]
pub struct Not<P>(pub P);

impl<O, P: Predicate<O>> Predicate<O> for Not<P> {
    fn evaluate(&self, owner: &O) -> bool {
        !self.0.evaluate(owner)
    }
}

impl<O, P: Predicate<O> + ?Sized> Predicate<O> for Box<P> {
    fn evaluate(&self, owner: &O) -> bool {
        (**self).evaluate(owner)
    }
}
