//! Flat export rows with hierarchy paths.

use serde::{Deserialize, Serialize};

use crate::hierarchy::HierarchyNode;
use crate::node::{NodeType, TaxonomyNode};

pub const PATH_SEPARATOR: &str = " > ";

pub const CSV_HEADERS: [&str; 9] = [
    "Name",
    "Description",
    "Type",
    "Strategy",
    "Parent",
    "Hierarchy Path",
    "Is Active",
    "Created By",
    "Last Modified",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

/// A node together with its position in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(flatten)]
    pub node: TaxonomyNode,
    pub hierarchy_path: String,
    pub parent_name: Option<String>,
}

impl ExportRow {
    pub fn to_csv_record(&self) -> Vec<String> {
        vec![
            self.node.name.clone(),
            self.node.description.clone(),
            self.node.node_type().to_string(),
            self.node.strategy.clone().unwrap_or_default(),
            self.parent_name.clone().unwrap_or_default(),
            self.hierarchy_path.clone(),
            self.node.is_active.to_string(),
            self.node.created_by.clone(),
            self.node.last_modified.to_rfc3339(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ExportData {
    Json { rows: Vec<ExportRow> },
    Csv { headers: Vec<String>, rows: Vec<Vec<String>> },
}

impl ExportData {
    pub fn build(format: ExportFormat, rows: Vec<ExportRow>) -> Self {
        match format {
            ExportFormat::Json => ExportData::Json { rows },
            ExportFormat::Csv => ExportData::Csv {
                headers: CSV_HEADERS.iter().map(|h| h.to_string()).collect(),
                rows: rows.iter().map(ExportRow::to_csv_record).collect(),
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ExportData::Json { rows } => rows.len(),
            ExportData::Csv { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flatten a forest depth-first, tagging each node with its root-first path.
///
/// `type_filter` drops rows after paths are computed, so filtered rows still
/// carry their full path.
pub fn export_rows(forest: &[HierarchyNode], type_filter: Option<NodeType>) -> Vec<ExportRow> {
    let mut rows = Vec::new();
    // (entry, path of its parent, parent name)
    let mut stack: Vec<(&HierarchyNode, String, Option<&str>)> = forest
        .iter()
        .rev()
        .map(|root| (root, String::new(), None))
        .collect();

    while let Some((entry, parent_path, parent_name)) = stack.pop() {
        let path = if parent_path.is_empty() {
            entry.node.name.clone()
        } else {
            format!("{parent_path}{PATH_SEPARATOR}{}", entry.node.name)
        };
        for child in entry.children.iter().rev() {
            stack.push((child, path.clone(), Some(entry.node.name.as_str())));
        }
        if type_filter.is_none_or(|t| t == entry.node.node_type()) {
            rows.push(ExportRow {
                node: entry.node.clone(),
                hierarchy_path: path,
                parent_name: parent_name.map(str::to_string),
            });
        }
    }
    rows
}

/// Render header and rows as RFC 4180 text.
pub fn to_csv_string(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for record in std::iter::once(headers).chain(rows.iter().map(Vec::as_slice)) {
        let line: Vec<String> = record.iter().map(|field| csv_field(field)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
