//! Read-only data consistency checks over a node snapshot.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use spm_core::NodeId;
use spm_core::validate::{ensure_length, ensure_optional_length};

use crate::hierarchy::{CycleCheck, detect_cycle};
use crate::node::{
    DESCRIPTION_MAX, DESCRIPTION_MIN, NAME_MAX, NAME_MIN, STRATEGY_MAX, STRATEGY_MIN, TaxonomyNode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyCheck {
    /// Every parent exists and has the expected type.
    HierarchyIntegrity,
    /// No parent chain loops back on itself.
    CircularReference,
    /// Every parent reference resolves.
    OrphanedNodes,
    /// Stored fields respect their length bounds.
    TypeValidation,
}

impl ConsistencyCheck {
    pub const ALL: [ConsistencyCheck; 4] = [
        ConsistencyCheck::HierarchyIntegrity,
        ConsistencyCheck::CircularReference,
        ConsistencyCheck::OrphanedNodes,
        ConsistencyCheck::TypeValidation,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingParent,
    InvalidParentType,
    CircularReference,
    Orphaned,
    InvalidField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    pub node_id: NodeId,
    pub node_name: String,
    pub kind: IssueKind,
    pub detail: String,
}

impl IntegrityIssue {
    fn new(node: &TaxonomyNode, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            node_id: node.id,
            node_name: node.name.clone(),
            kind,
            detail: detail.into(),
        }
    }
}

/// Run `check` against the nodes in `scope` (all of `nodes` when `None`).
///
/// `nodes` is the full table so that parents outside the scope still resolve.
pub fn run_check(
    check: ConsistencyCheck,
    nodes: &[TaxonomyNode],
    scope: Option<&HashSet<NodeId>>,
    max_steps: usize,
) -> Vec<IntegrityIssue> {
    let by_id: HashMap<NodeId, &TaxonomyNode> = nodes.iter().map(|n| (n.id, n)).collect();
    let in_scope = nodes
        .iter()
        .filter(|n| scope.is_none_or(|s| s.contains(&n.id)));

    let mut issues = Vec::new();
    for node in in_scope {
        match check {
            ConsistencyCheck::HierarchyIntegrity => {
                let Some(parent_id) = node.parent_id() else {
                    continue;
                };
                match by_id.get(&parent_id) {
                    None => issues.push(IntegrityIssue::new(
                        node,
                        IssueKind::MissingParent,
                        format!("parent {parent_id} does not exist"),
                    )),
                    Some(parent) if Some(parent.node_type()) != node.node_type().expected_parent() => {
                        issues.push(IntegrityIssue::new(
                            node,
                            IssueKind::InvalidParentType,
                            format!(
                                "{} node has {} parent",
                                node.node_type(),
                                parent.node_type()
                            ),
                        ))
                    }
                    Some(_) => {}
                }
            }
            ConsistencyCheck::CircularReference => {
                // Walk up from the parent; meeting the node itself means a loop.
                let outcome = detect_cycle(node.id, node.parent_id(), max_steps, |id| {
                    Ok::<_, Infallible>(by_id.get(&id).map(|n| n.parent_id()))
                });
                match outcome {
                    Ok(CycleCheck::Cycle) => issues.push(IntegrityIssue::new(
                        node,
                        IssueKind::CircularReference,
                        "node is its own ancestor",
                    )),
                    Ok(CycleCheck::Truncated) => issues.push(IntegrityIssue::new(
                        node,
                        IssueKind::CircularReference,
                        format!("ancestor chain exceeds {max_steps} steps"),
                    )),
                    Ok(CycleCheck::Clear) | Err(_) => {}
                }
            }
            ConsistencyCheck::OrphanedNodes => {
                if let Some(parent_id) = node.parent_id() {
                    if !by_id.contains_key(&parent_id) {
                        issues.push(IntegrityIssue::new(
                            node,
                            IssueKind::Orphaned,
                            format!("parent {parent_id} no longer exists"),
                        ));
                    }
                }
            }
            ConsistencyCheck::TypeValidation => {
                let checked = ensure_length("name", &node.name, NAME_MIN, NAME_MAX)
                    .and_then(|()| {
                        ensure_length(
                            "description",
                            &node.description,
                            DESCRIPTION_MIN,
                            DESCRIPTION_MAX,
                        )
                    })
                    .and_then(|()| {
                        ensure_optional_length(
                            "strategy",
                            node.strategy.as_deref(),
                            STRATEGY_MIN,
                            STRATEGY_MAX,
                        )
                    });
                if let Err(err) = checked {
                    issues.push(IntegrityIssue::new(node, IssueKind::InvalidField, err.to_string()));
                }
            }
        }
    }
    issues
}
