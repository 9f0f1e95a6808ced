use chrono::Duration;
use tracing::{debug, warn};

use spm_core::NodeId;
use spm_events::EventBus;
use spm_taxonomy::hierarchy::{self, HierarchyNode};
use spm_taxonomy::{NodeType, TaxonomyEvent, TaxonomyNode};

use super::{TaxonomyService, active_filter, type_filter};
use crate::error::ServiceResult;
use crate::store::{DocumentStore, Query};

impl<S, B> TaxonomyService<S, B>
where
    S: DocumentStore<TaxonomyNode>,
    B: EventBus<TaxonomyEvent>,
{
    pub fn get_by_id(&self, id: NodeId) -> ServiceResult<Option<TaxonomyNode>> {
        Ok(self.nodes.get(id)?)
    }

    /// First node with exactly this name.
    pub fn get_by_name(
        &self,
        name: &str,
        node_type: Option<NodeType>,
    ) -> ServiceResult<Option<TaxonomyNode>> {
        let name = name.to_string();
        let query = Query::all()
            .filter(type_filter(node_type))
            .filter(move |n: &TaxonomyNode| n.name == name);
        Ok(self.nodes.first(&query)?)
    }

    pub fn get_portfolios(&self, active_only: bool) -> ServiceResult<Vec<TaxonomyNode>> {
        self.by_type(NodeType::Portfolio, None, active_only)
    }

    /// Lines, optionally only those under `portfolio_id`.
    pub fn get_lines(
        &self,
        portfolio_id: Option<NodeId>,
        active_only: bool,
    ) -> ServiceResult<Vec<TaxonomyNode>> {
        self.by_type(NodeType::Line, portfolio_id, active_only)
    }

    /// Categories, optionally only those under `line_id`.
    pub fn get_categories(
        &self,
        line_id: Option<NodeId>,
        active_only: bool,
    ) -> ServiceResult<Vec<TaxonomyNode>> {
        self.by_type(NodeType::Category, line_id, active_only)
    }

    fn by_type(
        &self,
        node_type: NodeType,
        parent_id: Option<NodeId>,
        active_only: bool,
    ) -> ServiceResult<Vec<TaxonomyNode>> {
        let query = Query::all()
            .filter(type_filter(Some(node_type)))
            .filter(active_filter(active_only))
            .filter_if(parent_id.is_some(), move |n: &TaxonomyNode| {
                n.parent_id() == parent_id
            });
        Ok(self.nodes.collect(&query)?)
    }

    pub fn get_children(
        &self,
        parent_id: NodeId,
        node_type: Option<NodeType>,
        active_only: bool,
    ) -> ServiceResult<Vec<TaxonomyNode>> {
        let query = Query::all()
            .filter(move |n: &TaxonomyNode| n.parent_id() == Some(parent_id))
            .filter(type_filter(node_type))
            .filter(active_filter(active_only));
        Ok(self.nodes.collect(&query)?)
    }

    /// Nodes without a parent.
    pub fn get_top_level(&self, active_only: bool) -> ServiceResult<Vec<TaxonomyNode>> {
        let query = Query::all()
            .filter(TaxonomyNode::is_root)
            .filter(active_filter(active_only));
        Ok(self.nodes.collect(&query)?)
    }

    pub fn get_by_creator(
        &self,
        created_by: &str,
        node_type: Option<NodeType>,
    ) -> ServiceResult<Vec<TaxonomyNode>> {
        let created_by = created_by.to_string();
        let query = Query::all()
            .filter(move |n: &TaxonomyNode| n.created_by == created_by)
            .filter(type_filter(node_type));
        Ok(self.nodes.collect(&query)?)
    }

    /// Nodes modified within the last `hours_ago` hours (configured window when
    /// `None`), most recent first.
    pub fn get_recently_updated(
        &self,
        hours_ago: Option<u32>,
        node_type: Option<NodeType>,
    ) -> ServiceResult<Vec<TaxonomyNode>> {
        let hours = hours_ago.unwrap_or(self.config.recent_window_hours);
        let cutoff = self.now() - Duration::hours(i64::from(hours));
        let query = Query::all()
            .filter(move |n: &TaxonomyNode| n.last_modified >= cutoff)
            .filter(type_filter(node_type));
        let mut nodes = self.nodes.collect(&query)?;
        nodes.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(nodes)
    }

    /// The whole tree as a forest rooted at parentless nodes.
    pub fn get_full_hierarchy(&self, active_only: bool) -> ServiceResult<Vec<HierarchyNode>> {
        let nodes = self
            .nodes
            .collect(&Query::all().filter(active_filter(active_only)))?;
        let total = nodes.len();
        let forest = hierarchy::build_forest(nodes);
        let placed: usize = forest.iter().map(HierarchyNode::size).sum();
        if placed < total {
            debug!(total, placed, "nodes without a reachable root left out of the hierarchy");
        }
        Ok(forest)
    }

    /// Root-first ancestor path ending at `id`. Empty when `id` does not exist.
    pub fn get_breadcrumb(&self, id: NodeId) -> ServiceResult<Vec<TaxonomyNode>> {
        let path = hierarchy::collect_ancestors(id, self.config.max_ancestor_walk, |id| self.nodes.get(id))?;
        if path.truncated {
            warn!(node_id = %id, "breadcrumb walk stopped early; parent chain is corrupt or too deep");
        }
        Ok(path.nodes)
    }

    /// Case-insensitive substring search over name and description. An empty
    /// term matches every node that passes the filters.
    pub fn search(
        &self,
        term: &str,
        node_type: Option<NodeType>,
        active_only: bool,
    ) -> ServiceResult<Vec<TaxonomyNode>> {
        let needle = term.to_lowercase();
        let query = Query::all()
            .filter(type_filter(node_type))
            .filter(active_filter(active_only))
            .filter(move |n: &TaxonomyNode| n.matches_term(&needle));
        let hits = self.nodes.collect(&query)?;
        debug!(term, hits = hits.len(), "taxonomy search");
        Ok(hits)
    }
}
