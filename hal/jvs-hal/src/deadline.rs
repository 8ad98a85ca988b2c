//! Receive deadlines
//!
//! A deadline is an absolute point in time after which a read gives up.
//! It is computed once per exchange and handed down to every byte read, so
//! a slow trickle of bytes cannot stretch a frame past its budget.

use std::time::{Duration, Instant};

/// Absolute cut-off for a receive operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Deadline {
    /// Wait forever
    #[default]
    Never,
    /// Give up once this instant has passed
    At(Instant),
}

impl Deadline {
    /// Deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        // An unrepresentable instant is as good as no deadline at all
        match Instant::now().checked_add(timeout) {
            Some(at) => Deadline::At(at),
            None => Deadline::Never,
        }
    }

    /// A deadline that never elapses
    pub const fn never() -> Self {
        Deadline::Never
    }

    /// Returns true once the deadline has passed
    pub fn has_elapsed(&self) -> bool {
        match self {
            Deadline::Never => false,
            Deadline::At(at) => Instant::now() >= *at,
        }
    }

    /// Time left before the deadline, `None` if it never elapses
    ///
    /// Returns `Some(Duration::ZERO)` once elapsed.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Deadline::Never => None,
            Deadline::At(at) => Some(at.saturating_duration_since(Instant::now())),
        }
    }
}

impl From<Option<Duration>> for Deadline {
    fn from(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) => Deadline::after(timeout),
            None => Deadline::Never,
        }
    }
}
