//! Diagnostic logging hooks.
//!
//! The machine routes every structural event through a single call that
//! checks a [`LogCategory`] filter, forwards the event to `tracing`, and then
//! hands it to an optional host-installed sink. Logging never changes control
//! flow.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Bit-flag set of log event categories.
///
/// # Example
///
/// ```rust
/// use tickfsm::LogCategory;
///
/// let filter = LogCategory::STATE_ENTER | LogCategory::ERROR;
///
/// assert!(filter.contains(LogCategory::ERROR));
/// assert!(!filter.contains(LogCategory::STATE_EXIT));
/// assert!(LogCategory::ALL.contains(filter));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LogCategory(u8);

impl LogCategory {
    pub const NONE: Self = Self(0);
    pub const STATE_ENTER: Self = Self(1 << 0);
    pub const STATE_EXIT: Self = Self(1 << 1);
    pub const STATE_CREATED: Self = Self(1 << 2);
    pub const STATE_REGISTERED: Self = Self(1 << 3);
    pub const ERROR: Self = Self(1 << 4);
    pub const ALL: Self = Self(0b1_1111);

    const NAMED: [(Self, &'static str); 5] = [
        (Self::STATE_ENTER, "STATE_ENTER"),
        (Self::STATE_EXIT, "STATE_EXIT"),
        (Self::STATE_CREATED, "STATE_CREATED"),
        (Self::STATE_REGISTERED, "STATE_REGISTERED"),
        (Self::ERROR, "ERROR"),
    ];

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// True if every flag of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if at least one flag is shared.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LogCategory {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LogCategory {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for LogCategory {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for LogCategory {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl fmt::Debug for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(" | "))
    }
}

/// Host callback receiving `(message, category)` for every event that passes
/// the filter.
pub type LogSink = Box<dyn FnMut(&str, LogCategory)>;

/// Filter plus optional sink, owned by a machine.
pub(crate) struct Logger {
    filter: LogCategory,
    sink: Option<LogSink>,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            filter: LogCategory::ALL,
            sink: None,
        }
    }
}

impl Logger {
    pub(crate) fn filter(&self) -> LogCategory {
        self.filter
    }

    pub(crate) fn set_filter(&mut self, filter: LogCategory) {
        self.filter = filter;
    }

    pub(crate) fn set_sink(&mut self, sink: LogSink) {
        self.sink = Some(sink);
    }

    pub(crate) fn clear_sink(&mut self) {
        self.sink = None;
    }

    #[cfg(test)]
    pub(crate) fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn log(&mut self, category: LogCategory, message: &str) {
        if !self.filter.intersects(category) {
            return;
        }

        if category.contains(LogCategory::ERROR) {
            tracing::warn!(target: "tickfsm", category = ?category, "{}", message);
        } else {
            tracing::debug!(target: "tickfsm", category = ?category, "{}", message);
        }

        if let Some(sink) = self.sink.as_mut() {
            sink(message, category);
        }
    }
}
