//! Field validation helpers shared by domain records.

use crate::error::{DomainError, DomainResult};

/// Check that `value` has between `min` and `max` characters (inclusive).
///
/// Lengths are counted in Unicode scalar values, not bytes.
pub fn ensure_length(field: &str, value: &str, min: usize, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(DomainError::validation(format!(
            "{field} must be at least {min} characters (got {len})"
        )));
    }
    if len > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters (got {len})"
        )));
    }
    Ok(())
}

/// Same as [`ensure_length`] but accepts an absent value.
pub fn ensure_optional_length(
    field: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> DomainResult<()> {
    match value {
        Some(v) => ensure_length(field, v, min, max),
        None => Ok(()),
    }
}
