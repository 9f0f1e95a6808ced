//! Taxonomy node record, its placement in the tree and the write payloads.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use spm_core::validate::{ensure_length, ensure_optional_length};
use spm_core::{AggregateRoot, DomainError, DomainResult, Entity, NodeId};

use crate::history::{ChangeHistoryEntry, ChangeSet, ChangeSetBuilder, Changes};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 10;
pub const DESCRIPTION_MAX: usize = 1000;
pub const STRATEGY_MIN: usize = 5;
pub const STRATEGY_MAX: usize = 2000;

/// Level of a node in the three-level taxonomy.
///
/// Declaration order is the creation order used by bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Portfolio,
    Line,
    Category,
}

impl NodeType {
    pub const ALL: [NodeType; 3] = [NodeType::Portfolio, NodeType::Line, NodeType::Category];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Portfolio => "portfolio",
            NodeType::Line => "line",
            NodeType::Category => "category",
        }
    }

    /// The only type a node of this type may hang under.
    pub fn expected_parent(self) -> Option<NodeType> {
        match self {
            NodeType::Portfolio => None,
            NodeType::Line => Some(NodeType::Portfolio),
            NodeType::Category => Some(NodeType::Line),
        }
    }

    /// The only type that may hang under a node of this type.
    pub fn expected_child(self) -> Option<NodeType> {
        match self {
            NodeType::Portfolio => Some(NodeType::Line),
            NodeType::Line => Some(NodeType::Category),
            NodeType::Category => None,
        }
    }

    /// Reason recorded on the creation history entry.
    pub fn creation_reason(self) -> &'static str {
        match self {
            NodeType::Portfolio => "Portfolio creation",
            NodeType::Line => "Product line creation",
            NodeType::Category => "Category creation",
        }
    }
}

impl core::fmt::Display for NodeType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portfolio" => Ok(NodeType::Portfolio),
            "line" => Ok(NodeType::Line),
            "category" => Ok(NodeType::Category),
            other => Err(DomainError::validation(format!("invalid node type: {other}"))),
        }
    }
}

/// Where a node sits in the tree.
///
/// Portfolios carry no parent at all; lines and categories always carry one.
/// Whether the parent exists and has the right type is checked against the
/// store (see [`crate::hierarchy::validate_parent`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Placement {
    Portfolio,
    Line { parent_id: NodeId },
    Category { parent_id: NodeId },
}

impl Placement {
    /// Build a placement from a loosely-typed `(type, parent)` pair.
    pub fn new(node_type: NodeType, parent_id: Option<NodeId>) -> DomainResult<Self> {
        match (node_type, parent_id) {
            (NodeType::Portfolio, None) => Ok(Placement::Portfolio),
            (NodeType::Portfolio, Some(_)) => Err(DomainError::validation(
                "Portfolios cannot have parent nodes - they must be top-level",
            )),
            (NodeType::Line, Some(parent_id)) => Ok(Placement::Line { parent_id }),
            (NodeType::Category, Some(parent_id)) => Ok(Placement::Category { parent_id }),
            (node_type, None) => Err(DomainError::validation(format!(
                "{node_type} nodes must have a parent"
            ))),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Placement::Portfolio => NodeType::Portfolio,
            Placement::Line { .. } => NodeType::Line,
            Placement::Category { .. } => NodeType::Category,
        }
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        match self {
            Placement::Portfolio => None,
            Placement::Line { parent_id } | Placement::Category { parent_id } => Some(*parent_id),
        }
    }

    /// Same node type, different parent.
    pub fn reparented(&self, parent_id: Option<NodeId>) -> DomainResult<Self> {
        Self::new(self.node_type(), parent_id)
    }
}

/// A stored taxonomy node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub id: NodeId,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub placement: Placement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub is_active: bool,
    pub version: u64,
    pub change_history: Vec<ChangeHistoryEntry>,
    pub created_by: String,
    pub updated_by: String,
    pub last_modified: DateTime<Utc>,
}

impl TaxonomyNode {
    /// Materialize a stored node from an insert record and its assigned id.
    pub fn from_record(id: NodeId, record: NewTaxonomyNode) -> Self {
        Self {
            id,
            name: record.name,
            description: record.description,
            placement: record.placement,
            strategy: record.strategy,
            is_active: record.is_active,
            version: record.version,
            change_history: record.change_history,
            created_by: record.created_by,
            updated_by: record.updated_by,
            last_modified: record.last_modified,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.placement.node_type()
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.placement.parent_id()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id().is_none()
    }

    /// Case-insensitive substring match on name and description.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_term(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

impl Entity for TaxonomyNode {
    type Id = NodeId;

    fn id(&self) -> NodeId {
        self.id
    }
}

impl AggregateRoot for TaxonomyNode {
    fn version(&self) -> u64 {
        self.version
    }
}

/// Insert record: everything but the store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaxonomyNode {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub placement: Placement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub is_active: bool,
    pub version: u64,
    pub change_history: Vec<ChangeHistoryEntry>,
    pub created_by: String,
    pub updated_by: String,
    pub last_modified: DateTime<Utc>,
}

/// Command: create a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNode {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_by: String,
}

fn default_active() -> bool {
    true
}

impl CreateNode {
    pub fn new(
        node_type: NodeType,
        parent_id: Option<NodeId>,
        name: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            node_type,
            parent_id,
            strategy: None,
            is_active: true,
            created_by: created_by.into(),
        }
    }

    pub fn portfolio(
        name: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self::new(NodeType::Portfolio, None, name, description, created_by)
    }

    pub fn line(
        parent_id: NodeId,
        name: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self::new(NodeType::Line, Some(parent_id), name, description, created_by)
    }

    pub fn category(
        parent_id: NodeId,
        name: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self::new(NodeType::Category, Some(parent_id), name, description, created_by)
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Field bounds only; hierarchy rules need the store.
    pub fn validate_fields(&self) -> DomainResult<()> {
        ensure_length("name", &self.name, NAME_MIN, NAME_MAX)?;
        ensure_length("description", &self.description, DESCRIPTION_MIN, DESCRIPTION_MAX)?;
        ensure_optional_length("strategy", self.strategy.as_deref(), STRATEGY_MIN, STRATEGY_MAX)?;
        if self.created_by.trim().is_empty() {
            return Err(DomainError::validation("created_by cannot be empty"));
        }
        Ok(())
    }

    /// Build the insert record: version 1 and a single creation entry.
    pub fn into_record(self, placement: Placement, now: DateTime<Utc>) -> NewTaxonomyNode {
        let reason = placement.node_type().creation_reason();
        NewTaxonomyNode {
            name: self.name,
            description: self.description,
            placement,
            strategy: self.strategy,
            is_active: self.is_active,
            version: 1,
            change_history: vec![ChangeHistoryEntry {
                timestamp: now,
                updated_by: self.created_by.clone(),
                changes: Changes::Created,
                reason: Some(reason.to_string()),
            }],
            updated_by: self.created_by.clone(),
            created_by: self.created_by,
            last_modified: now,
        }
    }
}

/// Command payload: edit a node's fields and optionally its parent.
///
/// `None` leaves a field untouched. `strategy: Some(None)` clears the strategy;
/// `parent_id: Some(None)` asks for a null parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub strategy: Option<Option<String>>,
    #[serde(default)]
    pub parent_id: Option<Option<NodeId>>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn strategy(mut self, strategy: Option<String>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn parent(mut self, parent_id: Option<NodeId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn validate_fields(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            ensure_length("name", name, NAME_MIN, NAME_MAX)?;
        }
        if let Some(description) = &self.description {
            ensure_length("description", description, DESCRIPTION_MIN, DESCRIPTION_MAX)?;
        }
        if let Some(strategy) = &self.strategy {
            ensure_optional_length("strategy", strategy.as_deref(), STRATEGY_MIN, STRATEGY_MAX)?;
        }
        Ok(())
    }

    /// Whether this payload asks to move `node` under a different parent.
    pub fn changes_parent(&self, node: &TaxonomyNode) -> bool {
        matches!(self.parent_id, Some(parent) if parent != node.parent_id())
    }

    /// Field-by-field diff against the current state.
    ///
    /// Fails with [`DomainError::NoChanges`] when nothing differs.
    pub fn diff(&self, node: &TaxonomyNode) -> DomainResult<ChangeSet> {
        let mut changes = ChangeSetBuilder::new();
        if let Some(name) = &self.name {
            changes.record("name", &node.name, name);
        }
        if let Some(description) = &self.description {
            changes.record("description", &node.description, description);
        }
        if let Some(strategy) = &self.strategy {
            changes.record("strategy", &node.strategy, strategy);
        }
        if let Some(parent_id) = &self.parent_id {
            changes.record("parent_id", &node.parent_id(), parent_id);
        }
        changes.finish()
    }
}

/// Partial record applied by the store's `patch` primitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub strategy: Option<Option<String>>,
    pub placement: Option<Placement>,
    pub is_active: Option<bool>,
    pub version: Option<u64>,
    pub change_history: Option<Vec<ChangeHistoryEntry>>,
    pub updated_by: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl NodePatch {
    /// Audit bookkeeping every committed mutation writes.
    pub fn audited(
        version: u64,
        change_history: Vec<ChangeHistoryEntry>,
        updated_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            version: Some(version),
            change_history: Some(change_history),
            updated_by: Some(updated_by.into()),
            last_modified: Some(now),
            ..Self::default()
        }
    }

    pub fn apply(self, node: &mut TaxonomyNode) {
        if let Some(name) = self.name {
            node.name = name;
        }
        if let Some(description) = self.description {
            node.description = description;
        }
        if let Some(strategy) = self.strategy {
            node.strategy = strategy;
        }
        if let Some(placement) = self.placement {
            node.placement = placement;
        }
        if let Some(is_active) = self.is_active {
            node.is_active = is_active;
        }
        if let Some(version) = self.version {
            node.version = version;
        }
        if let Some(change_history) = self.change_history {
            node.change_history = change_history;
        }
        if let Some(updated_by) = self.updated_by {
            node.updated_by = updated_by;
        }
        if let Some(last_modified) = self.last_modified {
            node.last_modified = last_modified;
        }
    }
}
