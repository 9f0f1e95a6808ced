use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use spm_core::NodeId;

use crate::node::{NodeType, TaxonomyNode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodesByType {
    pub portfolio: usize,
    pub line: usize,
    pub category: usize,
}

/// Shape and health summary of a set of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeMetrics {
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub inactive_nodes: usize,
    pub nodes_by_type: NodesByType,
    /// Longest parent chain (in edges) within the set. A link to a parent
    /// outside the set adds no level, so a subtree root sits at depth 0.
    pub max_depth: usize,
    pub nodes_with_strategy: usize,
    /// Mean child count over the nodes that have at least one child.
    pub average_children_per_node: f64,
    /// Nodes whose parent is not in the set.
    pub orphaned_nodes: usize,
}

impl TreeMetrics {
    /// Compute metrics over `nodes`.
    ///
    /// `subtree_root`, when given, is the node the set was collected from: its
    /// own parent lies outside the set on purpose and does not make it an orphan.
    pub fn compute(nodes: &[TaxonomyNode], subtree_root: Option<NodeId>) -> Self {
        let by_id: HashMap<NodeId, &TaxonomyNode> = nodes.iter().map(|n| (n.id, n)).collect();

        let mut nodes_by_type = NodesByType::default();
        let mut child_counts: HashMap<NodeId, usize> = HashMap::new();
        let mut orphaned_nodes = 0;

        for node in nodes {
            match node.node_type() {
                NodeType::Portfolio => nodes_by_type.portfolio += 1,
                NodeType::Line => nodes_by_type.line += 1,
                NodeType::Category => nodes_by_type.category += 1,
            }
            if let Some(parent_id) = node.parent_id() {
                if by_id.contains_key(&parent_id) {
                    *child_counts.entry(parent_id).or_default() += 1;
                } else if Some(node.id) != subtree_root {
                    orphaned_nodes += 1;
                }
            }
        }

        let active_nodes = nodes.iter().filter(|n| n.is_active).count();
        let average_children_per_node = if child_counts.is_empty() {
            0.0
        } else {
            child_counts.values().sum::<usize>() as f64 / child_counts.len() as f64
        };

        Self {
            total_nodes: nodes.len(),
            active_nodes,
            inactive_nodes: nodes.len() - active_nodes,
            nodes_by_type,
            max_depth: nodes
                .iter()
                .map(|n| depth_within(n, &by_id))
                .max()
                .unwrap_or(0),
            nodes_with_strategy: nodes.iter().filter(|n| n.strategy.is_some()).count(),
            average_children_per_node,
            orphaned_nodes,
        }
    }
}

/// Counts only parent links that stay inside `by_id`.
fn depth_within(node: &TaxonomyNode, by_id: &HashMap<NodeId, &TaxonomyNode>) -> usize {
    let mut depth = 0;
    let mut seen = HashSet::from([node.id]);
    let mut current = node;
    while let Some(parent) = current.parent_id().and_then(|p| by_id.get(&p)) {
        if !seen.insert(parent.id) {
            break;
        }
        depth += 1;
        current = parent;
    }
    depth
}
