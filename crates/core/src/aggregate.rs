//! Aggregate contract: pure decision logic plus deterministic state evolution.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Monotonically increasing state version; for event-sourced aggregates
    /// this matches the stream revision (+1 per applied event).
    fn version(&self) -> u64;
}

/// Optimistic-concurrency expectation checked on append.
///
/// Two writers racing on the same order/lot both load the same version; the
/// second append fails the `Exact` check and surfaces a conflict, so a
/// remaining quantity can never be decremented twice from one snapshot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip the check (idempotent commands, migrations).
    Any,
    /// Require the stream to be at exactly this revision.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "stale aggregate version (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Pure execution semantics.
///
/// - `handle(&self, cmd)` decides which events to emit; it must not mutate
///   state and must not perform IO.
/// - `apply(&mut self, event)` evolves state deterministically.
///
/// Everything an operation changes is expressed as events from a single
/// `handle` call, so one stream append commits the whole operation or none
/// of it.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_version_mismatch_is_a_conflict() {
        let err = ExpectedVersion::Exact(3).check(5).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn any_matches_everything() {
        assert!(ExpectedVersion::Any.matches(0));
        assert!(ExpectedVersion::Any.matches(42));
    }
}
