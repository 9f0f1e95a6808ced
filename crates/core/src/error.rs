//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// lifecycle transitions, structural guards). Store failures belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value or structural rule failed validation (field bounds, hierarchy
    /// rules, circular references).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// An update payload is identical to the current state.
    #[error("no changes detected")]
    NoChanges,

    /// Reactivation requested for a record that is already active.
    #[error("node is already active")]
    AlreadyActive,

    /// Deactivation requested for a record that is already inactive.
    #[error("node is already inactive")]
    AlreadyInactive,

    /// Reactivation blocked because the parent is inactive (or gone).
    #[error("cannot reactivate node: parent is inactive")]
    ParentInactive,

    /// Hard delete blocked because the record still has children.
    #[error("cannot delete node with children; use force delete or move children first")]
    HasChildren,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::NoChanges => "no_changes",
            DomainError::AlreadyActive => "already_active",
            DomainError::AlreadyInactive => "already_inactive",
            DomainError::ParentInactive => "parent_inactive",
            DomainError::HasChildren => "has_children",
            DomainError::InvalidId(_) => "invalid_id",
        }
    }
}
