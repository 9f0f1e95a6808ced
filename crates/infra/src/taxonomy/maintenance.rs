use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use spm_core::{DomainError, NodeId};
use spm_events::EventBus;
use spm_taxonomy::export::{self, ExportData, ExportFormat};
use spm_taxonomy::import::{self, ImportNode, ImportReport, ImportResult};
use spm_taxonomy::integrity::{self, ConsistencyCheck, IntegrityIssue};
use spm_taxonomy::suggest::{self, SuggestionResult};
use spm_taxonomy::{CreateNode, NodeType, TaxonomyEvent, TaxonomyNode, TreeMetrics};

use super::TaxonomyService;
use crate::error::ServiceResult;
use crate::store::{DocumentStore, Query};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkExport {
    pub format: ExportFormat,
    pub count: usize,
    pub data: ExportData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedNode {
    pub node_id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub missing_parent_id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanCleanup {
    pub dry_run: bool,
    pub orphans: Vec<OrphanedNode>,
    /// Nodes removed, orphan subtrees included. Zero on a dry run.
    pub removed_count: usize,
}

/// Which nodes a consistency check looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckScope {
    #[default]
    All,
    /// The node and everything below it.
    Subtree(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub check: ConsistencyCheck,
    pub scope: CheckScope,
    pub nodes_checked: usize,
    pub issues: Vec<IntegrityIssue>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl<S, B> TaxonomyService<S, B>
where
    S: DocumentStore<TaxonomyNode>,
    B: EventBus<TaxonomyEvent>,
{
    /// Create many nodes at once, parents referenced by name.
    ///
    /// Rows run portfolio first, then lines, then categories. A parent name
    /// resolves against rows created earlier in this batch, then against
    /// stored nodes of the expected parent type. Rows fail independently.
    #[instrument(skip_all, fields(rows = rows.len(), actor = imported_by))]
    pub fn bulk_import(&self, rows: &[ImportNode], imported_by: &str) -> ImportReport {
        let mut created: HashMap<(NodeType, String), NodeId> = HashMap::new();
        let mut report = ImportReport::default();
        let mut events = Vec::new();

        for row in import::creation_order(rows) {
            let result = match self.resolve_import_parent(row, &created) {
                Ok(parent_id) => {
                    let cmd = CreateNode {
                        name: row.name.clone(),
                        description: row.description.clone(),
                        node_type: row.node_type,
                        parent_id,
                        strategy: row.strategy.clone(),
                        is_active: row.is_active.unwrap_or(true),
                        created_by: imported_by.to_string(),
                    };
                    self.insert_node(cmd)
                }
                Err(err) => Err(err),
            };

            match result {
                Ok((id, event)) => {
                    events.push(event);
                    created.insert((row.node_type, row.name.clone()), id);
                    report.push(ImportResult::created(row, id));
                }
                Err(err) => {
                    warn!(name = %row.name, node_type = %row.node_type, error = %err, "import row failed");
                    report.push(ImportResult::failed(row, err.to_string()));
                }
            }
        }

        // Rows are already committed; a bus failure is logged per event.
        let _ = self.publish_all(events);

        info!(
            success = report.success_count,
            errors = report.error_count,
            "bulk import finished"
        );
        report
    }

    fn resolve_import_parent(
        &self,
        row: &ImportNode,
        created: &HashMap<(NodeType, String), NodeId>,
    ) -> ServiceResult<Option<NodeId>> {
        let Some(parent_name) = row.parent_name.as_deref() else {
            return Ok(None);
        };
        let Some(parent_type) = row.node_type.expected_parent() else {
            return Err(DomainError::validation(
                "Portfolios cannot have parent nodes - they must be top-level",
            )
            .into());
        };
        if let Some(id) = created.get(&(parent_type, parent_name.to_string())) {
            return Ok(Some(*id));
        }
        match self.get_by_name(parent_name, Some(parent_type))? {
            Some(parent) => Ok(Some(parent.id)),
            None => Err(DomainError::validation(format!(
                "Parent {parent_type} '{parent_name}' not found"
            ))
            .into()),
        }
    }

    /// Flatten the hierarchy into export rows.
    pub fn bulk_export(
        &self,
        format: ExportFormat,
        include_inactive: bool,
        type_filter: Option<NodeType>,
    ) -> ServiceResult<BulkExport> {
        let forest = self.get_full_hierarchy(!include_inactive)?;
        let rows = export::export_rows(&forest, type_filter);
        let data = ExportData::build(format, rows);
        Ok(BulkExport {
            format,
            count: data.len(),
            data,
        })
    }

    /// Metrics over the whole table, or over the subtree rooted at `root`.
    pub fn calculate_tree_metrics(&self, root: Option<NodeId>) -> ServiceResult<TreeMetrics> {
        let nodes = match root {
            Some(root_id) => {
                let mut nodes = vec![self.load(root_id)?];
                nodes.extend(self.descendants(root_id)?);
                nodes
            }
            None => self.nodes.collect(&Query::all())?,
        };
        Ok(TreeMetrics::compute(&nodes, root))
    }

    /// Find nodes whose parent no longer exists and, unless `dry_run`, delete
    /// them together with their subtrees.
    #[instrument(skip_all, fields(dry_run = dry_run, actor = updated_by))]
    pub fn cleanup_orphaned_nodes(&self, updated_by: &str, dry_run: bool) -> ServiceResult<OrphanCleanup> {
        let all = self.nodes.collect(&Query::all())?;
        let ids: HashSet<NodeId> = all.iter().map(|n| n.id).collect();
        let orphans: Vec<OrphanedNode> = all
            .iter()
            .filter_map(|n| {
                let parent_id = n.parent_id()?;
                (!ids.contains(&parent_id)).then(|| OrphanedNode {
                    node_id: n.id,
                    name: n.name.clone(),
                    node_type: n.node_type(),
                    missing_parent_id: parent_id,
                })
            })
            .collect();

        let mut removed_count = 0;
        let mut events = Vec::new();
        let mut written = Ok(());
        if !dry_run {
            for orphan in &orphans {
                warn!(node_id = %orphan.node_id, missing_parent = %orphan.missing_parent_id, "removing orphaned node");
                let outcome = self
                    .load(orphan.node_id)
                    .and_then(|node| self.remove_subtree(node, true, updated_by, &mut events));
                match outcome {
                    Ok(count) => removed_count += count,
                    Err(err) => {
                        written = Err(err);
                        break;
                    }
                }
            }
        }
        let published = self.publish_all(events);
        written?;
        published?;

        info!(orphans = orphans.len(), removed_count, "orphan cleanup finished");
        Ok(OrphanCleanup {
            dry_run,
            orphans,
            removed_count,
        })
    }

    pub fn run_consistency_check(
        &self,
        check: ConsistencyCheck,
        scope: CheckScope,
    ) -> ServiceResult<ConsistencyReport> {
        let all = self.nodes.collect(&Query::all())?;
        let scoped: Option<HashSet<NodeId>> = match scope {
            CheckScope::All => None,
            CheckScope::Subtree(root) => {
                self.load(root)?;
                let mut ids = HashSet::from([root]);
                ids.extend(self.descendants(root)?.into_iter().map(|n| n.id));
                Some(ids)
            }
        };

        let issues = integrity::run_check(check, &all, scoped.as_ref(), self.config.max_ancestor_walk);
        if !issues.is_empty() {
            warn!(?check, issues = issues.len(), "consistency check found issues");
        }
        Ok(ConsistencyReport {
            check,
            scope,
            nodes_checked: scoped.as_ref().map_or(all.len(), HashSet::len),
            issues,
        })
    }

    /// Rank active categories for a product name and description.
    pub fn suggest_category(
        &self,
        product_name: &str,
        product_description: Option<&str>,
    ) -> ServiceResult<SuggestionResult> {
        if product_name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty").into());
        }
        let started = Instant::now();
        let forest = self.get_full_hierarchy(true)?;
        let candidates = suggest::category_candidates(&forest);
        let suggestions = suggest::suggest_categories(
            product_name,
            product_description,
            &candidates,
            self.config.suggestion_limit,
        );
        Ok(SuggestionResult {
            suggestions,
            total_categories: candidates.len(),
            processing_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
