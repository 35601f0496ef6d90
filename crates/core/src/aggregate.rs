//! Event-sourced aggregates.
//!
//! A product is rebuilt by replaying its journal, decides on commands without
//! touching state, and reports how many events it has seen. That count is the
//! version persistence compares against when a write was decided earlier
//! (the deletion check, for instance).

use crate::error::{DomainError, DomainResult};

/// Identity and version of an event-sourced instance.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Events applied so far; 0 for a fresh instance.
    fn version(&self) -> u64;
}

/// Version a write was decided against.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Write regardless of the stored version.
    Any,
    /// Write only if the stored stream is exactly this long.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    /// `Conflict` when the stored version moved past the expected one.
    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Command handling for an event-sourced aggregate.
///
/// `handle` validates a command against current state and returns the events
/// it implies; a rejected command yields `Error` and no events. `apply` folds
/// one event into state and must accept anything `handle` produced, since it
/// also runs when the journal is replayed.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Fold one event into state; bumps the version by one.
    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
