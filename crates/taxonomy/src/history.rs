//! Append-only change history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use spm_core::{DomainError, DomainResult};

/// Old and new value of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: JsonValue,
    pub to: JsonValue,
}

impl FieldChange {
    pub fn new<T: Serialize + ?Sized>(from: &T, to: &T) -> Self {
        Self {
            from: to_json(from),
            to: to_json(to),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> JsonValue {
    // Field values are plain strings, bools, ids and options thereof.
    serde_json::to_value(value).unwrap_or(JsonValue::Null)
}

/// Field name → change, ordered by field name.
pub type ChangeSet = BTreeMap<String, FieldChange>;

/// What a history entry records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum Changes {
    /// The node was inserted.
    Created,
    /// One or more fields changed.
    Fields(ChangeSet),
}

impl Changes {
    /// A single-field change set.
    pub fn field<T: Serialize + ?Sized>(name: &str, from: &T, to: &T) -> Self {
        let mut set = ChangeSet::new();
        set.insert(name.to_string(), FieldChange::new(from, to));
        Changes::Fields(set)
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        match self {
            Changes::Created => None,
            Changes::Fields(set) => set.get(field),
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub updated_by: String,
    pub changes: Changes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Return `existing` plus one new entry. The input is left untouched.
pub fn add_change_history_entry(
    existing: &[ChangeHistoryEntry],
    updated_by: &str,
    changes: Changes,
    reason: Option<&str>,
    timestamp: DateTime<Utc>,
) -> Vec<ChangeHistoryEntry> {
    let mut history = Vec::with_capacity(existing.len() + 1);
    history.extend_from_slice(existing);
    history.push(ChangeHistoryEntry {
        timestamp,
        updated_by: updated_by.to_string(),
        changes,
        reason: reason.map(str::to_string),
    });
    history
}

/// Collects `{from, to}` pairs for fields whose value differs.
#[derive(Debug, Default)]
pub struct ChangeSetBuilder {
    changes: ChangeSet,
}

impl ChangeSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<T>(&mut self, field: &str, from: &T, to: &T)
    where
        T: Serialize + PartialEq + ?Sized,
    {
        if from != to {
            self.changes
                .insert(field.to_string(), FieldChange::new(from, to));
        }
    }

    /// Fails with [`DomainError::NoChanges`] when no field differed.
    pub fn finish(self) -> DomainResult<ChangeSet> {
        if self.changes.is_empty() {
            return Err(DomainError::NoChanges);
        }
        Ok(self.changes)
    }
}
