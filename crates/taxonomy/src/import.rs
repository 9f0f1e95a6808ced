//! Bulk import payloads and results.

use serde::{Deserialize, Serialize};

use spm_core::NodeId;

use crate::node::NodeType;

/// One row of a bulk import. Parents are referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportNode {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ImportNode {
    pub fn new(
        node_type: NodeType,
        name: impl Into<String>,
        description: impl Into<String>,
        parent_name: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            node_type,
            parent_name: parent_name.map(str::to_string),
            strategy: None,
            is_active: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResult {
    pub fn created(row: &ImportNode, node_id: NodeId) -> Self {
        Self {
            name: row.name.clone(),
            node_type: row.node_type,
            success: true,
            node_id: Some(node_id),
            error: None,
        }
    }

    pub fn failed(row: &ImportNode, error: impl Into<String>) -> Self {
        Self {
            name: row.name.clone(),
            node_type: row.node_type,
            success: false,
            node_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub total_processed: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<ImportResult>,
}

impl ImportReport {
    pub fn push(&mut self, result: ImportResult) {
        self.total_processed += 1;
        if result.success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        self.results.push(result);
    }
}

/// Rows ordered portfolio, line, category; input order is kept within a type.
pub fn creation_order(rows: &[ImportNode]) -> Vec<&ImportNode> {
    let mut ordered: Vec<&ImportNode> = rows.iter().collect();
    ordered.sort_by_key(|row| row.node_type);
    ordered
}
