//! Hierarchy change notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use spm_core::NodeId;
use spm_events::Event;

use crate::history::ChangeSet;
use crate::node::NodeType;

/// Event: NodeCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCreated {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub parent_id: Option<NodeId>,
    pub name: String,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: NodeUpdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdated {
    pub node_id: NodeId,
    pub changes: ChangeSet,
    pub version: u64,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: NodeMoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMoved {
    pub node_id: NodeId,
    pub old_parent_id: Option<NodeId>,
    pub new_parent_id: Option<NodeId>,
    pub version: u64,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: NodeDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDeactivated {
    pub node_id: NodeId,
    /// Deactivated because an ancestor was deactivated with cascade.
    pub cascaded: bool,
    pub version: u64,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: NodeReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReactivated {
    pub node_id: NodeId,
    pub version: u64,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: NodeDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDeleted {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub parent_id: Option<NodeId>,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaxonomyEvent {
    NodeCreated(NodeCreated),
    NodeUpdated(NodeUpdated),
    NodeMoved(NodeMoved),
    NodeDeactivated(NodeDeactivated),
    NodeReactivated(NodeReactivated),
    NodeDeleted(NodeDeleted),
}

impl TaxonomyEvent {
    pub fn node_id(&self) -> NodeId {
        match self {
            TaxonomyEvent::NodeCreated(e) => e.node_id,
            TaxonomyEvent::NodeUpdated(e) => e.node_id,
            TaxonomyEvent::NodeMoved(e) => e.node_id,
            TaxonomyEvent::NodeDeactivated(e) => e.node_id,
            TaxonomyEvent::NodeReactivated(e) => e.node_id,
            TaxonomyEvent::NodeDeleted(e) => e.node_id,
        }
    }

    pub fn actor(&self) -> &str {
        match self {
            TaxonomyEvent::NodeCreated(e) => &e.actor,
            TaxonomyEvent::NodeUpdated(e) => &e.actor,
            TaxonomyEvent::NodeMoved(e) => &e.actor,
            TaxonomyEvent::NodeDeactivated(e) => &e.actor,
            TaxonomyEvent::NodeReactivated(e) => &e.actor,
            TaxonomyEvent::NodeDeleted(e) => &e.actor,
        }
    }
}

impl Event for TaxonomyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TaxonomyEvent::NodeCreated(_) => "taxonomy.node.created",
            TaxonomyEvent::NodeUpdated(_) => "taxonomy.node.updated",
            TaxonomyEvent::NodeMoved(_) => "taxonomy.node.moved",
            TaxonomyEvent::NodeDeactivated(_) => "taxonomy.node.deactivated",
            TaxonomyEvent::NodeReactivated(_) => "taxonomy.node.reactivated",
            TaxonomyEvent::NodeDeleted(_) => "taxonomy.node.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TaxonomyEvent::NodeCreated(e) => e.occurred_at,
            TaxonomyEvent::NodeUpdated(e) => e.occurred_at,
            TaxonomyEvent::NodeMoved(e) => e.occurred_at,
            TaxonomyEvent::NodeDeactivated(e) => e.occurred_at,
            TaxonomyEvent::NodeReactivated(e) => e.occurred_at,
            TaxonomyEvent::NodeDeleted(e) => e.occurred_at,
        }
    }
}
