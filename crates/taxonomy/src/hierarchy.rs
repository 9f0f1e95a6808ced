//! Structural rules of the taxonomy tree and pure tree walks.
//!
//! Nothing here talks to a store directly: upward walks take a lookup closure
//! so that callers decide how (and how often) the store is hit.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use spm_core::{DomainError, DomainResult, NodeId};

use crate::node::{NodeType, Placement, TaxonomyNode};

/// Check a placement against the node its parent pointer resolves to.
///
/// `parent` is the result of looking up `placement.parent_id()`; `None` means
/// the lookup found nothing.
pub fn validate_parent(placement: &Placement, parent: Option<&TaxonomyNode>) -> DomainResult<()> {
    let Some(expected) = placement.node_type().expected_parent() else {
        return Ok(());
    };
    let Some(parent) = parent else {
        return Err(DomainError::validation("Parent node not found"));
    };
    if parent.node_type() != expected {
        return Err(DomainError::validation(match placement.node_type() {
            NodeType::Line => "Product line must have portfolio parent",
            _ => "Category must have product line parent",
        }));
    }
    Ok(())
}

/// Non-failing answer for pre-flight checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ParentValidation {
    pub fn from_result(result: DomainResult<()>) -> Self {
        match result {
            Ok(()) => Self {
                valid: true,
                reason: None,
            },
            Err(DomainError::Validation(reason)) => Self {
                valid: false,
                reason: Some(reason),
            },
            Err(other) => Self {
                valid: false,
                reason: Some(other.to_string()),
            },
        }
    }
}

/// Outcome of an upward cycle walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleCheck {
    /// The walk reached a root, a missing node or pre-existing corruption
    /// without meeting the node.
    Clear,
    /// The node is the candidate parent itself or one of its ancestors.
    Cycle,
    /// The step budget ran out before the walk finished.
    Truncated,
}

impl CycleCheck {
    /// Truncated walks are refused like cycles.
    pub fn blocks_write(self) -> bool {
        !matches!(self, CycleCheck::Clear)
    }
}

/// Walk up from `candidate_parent` and report whether `node_id` is met.
///
/// `parent_of` returns `Ok(None)` for a missing node and `Ok(Some(parent))`
/// otherwise. Each node is visited at most once; revisiting a node means the
/// stored chain is already corrupt and the walk stops.
pub fn detect_cycle<E, F>(
    node_id: NodeId,
    candidate_parent: Option<NodeId>,
    max_steps: usize,
    mut parent_of: F,
) -> Result<CycleCheck, E>
where
    F: FnMut(NodeId) -> Result<Option<Option<NodeId>>, E>,
{
    let mut visited = HashSet::new();
    let mut current = candidate_parent;

    while let Some(id) = current {
        if id == node_id {
            return Ok(CycleCheck::Cycle);
        }
        if !visited.insert(id) {
            return Ok(CycleCheck::Clear);
        }
        if visited.len() > max_steps {
            return Ok(CycleCheck::Truncated);
        }
        current = parent_of(id)?.flatten();
    }

    Ok(CycleCheck::Clear)
}

/// Root-first ancestor path ending at `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct AncestorPath {
    pub nodes: Vec<TaxonomyNode>,
    /// The walk stopped at the step budget or at a revisited node.
    pub truncated: bool,
}

/// Walk parent pointers up from `start`, prepending each node found.
///
/// Ends silently at a root or at a missing node.
pub fn collect_ancestors<E, F>(start: NodeId, max_steps: usize, mut lookup: F) -> Result<AncestorPath, E>
where
    F: FnMut(NodeId) -> Result<Option<TaxonomyNode>, E>,
{
    let mut visited = HashSet::new();
    let mut nodes = Vec::new();
    let mut current = Some(start);
    let mut truncated = false;

    while let Some(id) = current {
        if !visited.insert(id) || visited.len() > max_steps {
            truncated = true;
            break;
        }
        let Some(node) = lookup(id)? else {
            break;
        };
        current = node.parent_id();
        nodes.push(node);
    }

    nodes.reverse();
    Ok(AncestorPath { nodes, truncated })
}

/// A node with its children nested below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    #[serde(flatten)]
    pub node: TaxonomyNode,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Number of nodes in this subtree, itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::size).sum::<usize>()
    }
}

/// Assemble a forest from flat records.
///
/// Roots are the nodes without a parent. Children keep the input order. Nodes
/// whose parent is absent from `nodes` are not reachable from a root and do not
/// appear in the result.
pub fn build_forest(nodes: Vec<TaxonomyNode>) -> Vec<HierarchyNode> {
    let mut roots = Vec::new();
    let mut children: HashMap<NodeId, Vec<TaxonomyNode>> = HashMap::new();

    for node in nodes {
        match node.parent_id() {
            None => roots.push(node),
            Some(parent_id) => children.entry(parent_id).or_default().push(node),
        }
    }

    roots
        .into_iter()
        .map(|root| attach_children(root, &mut children))
        .collect()
}

fn attach_children(
    node: TaxonomyNode,
    children: &mut HashMap<NodeId, Vec<TaxonomyNode>>,
) -> HierarchyNode {
    let kids = children.remove(&node.id).unwrap_or_default();
    HierarchyNode {
        node,
        children: kids
            .into_iter()
            .map(|child| attach_children(child, children))
            .collect(),
    }
}

/// Depth-first, pre-order flattening of a forest.
pub fn flatten(forest: &[HierarchyNode]) -> Vec<&TaxonomyNode> {
    let mut out = Vec::new();
    let mut stack: Vec<&HierarchyNode> = forest.iter().rev().collect();
    while let Some(entry) = stack.pop() {
        out.push(&entry.node);
        stack.extend(entry.children.iter().rev());
    }
    out
}
