//! Aggregate root trait for versioned, audited records.

use crate::entity::Entity;

/// Aggregate root marker + minimal interface.
///
/// The version is advisory: writers bump it by one per committed mutation but
/// nothing compares-and-swaps on it.
pub trait AggregateRoot: Entity {
    /// Monotonically increasing version of the record's state (starts at 1).
    fn version(&self) -> u64;

    /// Returns the version the next committed mutation must write.
    fn next_version(&self) -> u64 {
        self.version() + 1
    }
}
