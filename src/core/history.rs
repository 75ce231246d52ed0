//! Backward-navigation history.
//!
//! The history is a stack of previously active entries. Only forward
//! transitions push, and they push the entry being left, never the one being
//! entered.

/// Last-in-first-out record of previously active states.
///
/// # Example
///
/// ```rust
/// use tickfsm::StateHistory;
///
/// let mut history = StateHistory::new();
/// history.push("idle");
/// history.push("walk");
///
/// assert_eq!(history.peek(), Some(&"walk"));
/// assert_eq!(history.oldest_first().copied().collect::<Vec<_>>(), ["idle", "walk"]);
/// assert_eq!(history.pop(), Some("walk"));
/// assert_eq!(history.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateHistory<T> {
    entries: Vec<T>,
}

impl<T> Default for StateHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StateHistory<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop()
    }

    /// Most recently pushed entry.
    pub fn peek(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from the bottom of the stack to the top.
    pub fn oldest_first(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.entries.iter()
    }

    /// Entries from the top of the stack to the bottom.
    pub fn newest_first(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.entries.iter().rev()
    }

    /// Replace the whole stack. `entries` is given top first, the order
    /// [`newest_first`](Self::newest_first) yields.
    pub fn replace_newest_first<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.entries.clear();
        self.entries.extend(entries);
        self.entries.reverse();
    }
}
