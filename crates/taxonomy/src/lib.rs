//! Taxonomy domain: portfolio → line → category nodes.
//!
//! Everything here is pure and store-agnostic. Walks over the store are
//! expressed as functions taking lookup closures; the service layer in
//! `spm-infra` supplies them.

pub mod event;
pub mod export;
pub mod hierarchy;
pub mod history;
pub mod import;
pub mod integrity;
pub mod metrics;
pub mod node;
pub mod suggest;

pub use event::TaxonomyEvent;
pub use export::{ExportData, ExportFormat, ExportRow};
pub use hierarchy::{AncestorPath, CycleCheck, HierarchyNode, ParentValidation};
pub use history::{ChangeHistoryEntry, ChangeSet, Changes, FieldChange, add_change_history_entry};
pub use import::{ImportNode, ImportReport, ImportResult};
pub use integrity::{ConsistencyCheck, IntegrityIssue, IssueKind};
pub use metrics::TreeMetrics;
pub use node::{CreateNode, NewTaxonomyNode, NodePatch, NodeType, NodeUpdate, Placement, TaxonomyNode};
pub use suggest::{CategoryCandidate, CategorySuggestion, SuggestionResult};
