//! Taxonomy service: hierarchy rules, mutations, queries and maintenance over a
//! node store, with change notifications published after each commit.

mod maintenance;
mod mutations;
mod queries;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use spm_core::{Clock, DomainError, NodeId, SystemClock};
use spm_events::EventBus;
use spm_taxonomy::{NodeType, TaxonomyEvent, TaxonomyNode};

use crate::config::SpmConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, Query};

pub use maintenance::{BulkExport, CheckScope, ConsistencyReport, OrphanCleanup, OrphanedNode};

/// Result of a deactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deactivation {
    /// The node itself plus every descendant switched off by the cascade.
    pub deactivated_count: usize,
}

/// Result of a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    pub deleted_count: usize,
}

pub struct TaxonomyService<S, B> {
    nodes: S,
    bus: B,
    clock: Arc<dyn Clock>,
    config: SpmConfig,
}

impl<S, B> TaxonomyService<S, B>
where
    S: DocumentStore<TaxonomyNode>,
    B: EventBus<TaxonomyEvent>,
{
    pub fn new(nodes: S, bus: B) -> Self {
        Self {
            nodes,
            bus,
            clock: Arc::new(SystemClock),
            config: SpmConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_config(mut self, config: SpmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.nodes
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn config(&self) -> &SpmConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn publish(&self, event: TaxonomyEvent) -> ServiceResult<()> {
        self.bus
            .publish(event)
            .map_err(|err| ServiceError::Publish(format!("{err:?}")))
    }

    /// Publish every event, even after a failure. Returns the first failure.
    fn publish_all(&self, events: Vec<TaxonomyEvent>) -> ServiceResult<()> {
        let mut first_failure = None;
        for event in events {
            let node_id = event.node_id();
            if let Err(err) = self.publish(event) {
                warn!(node_id = %node_id, error = %err, "notification not delivered");
                first_failure.get_or_insert(err);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    /// Load a node or fail with `NotFound`.
    fn load(&self, id: NodeId) -> ServiceResult<TaxonomyNode> {
        self.nodes
            .get(id)?
            .ok_or_else(|| DomainError::not_found(format!("node {id}")).into())
    }

    fn children_of(&self, parent_id: NodeId) -> ServiceResult<Vec<TaxonomyNode>> {
        let query = Query::all().filter(move |n: &TaxonomyNode| n.parent_id() == Some(parent_id));
        Ok(self.nodes.collect(&query)?)
    }

    /// Every node below `root`, depth-first pre-order, one store round trip
    /// per visited node. Already-visited nodes are skipped.
    fn descendants(&self, root: NodeId) -> ServiceResult<Vec<TaxonomyNode>> {
        let mut out = Vec::new();
        let mut visited = HashSet::from([root]);
        let mut stack: Vec<TaxonomyNode> = self.children_of(root)?.into_iter().rev().collect();

        while let Some(node) = stack.pop() {
            if !visited.insert(node.id) {
                continue;
            }
            let children = self.children_of(node.id)?;
            stack.extend(children.into_iter().rev());
            out.push(node);
        }
        Ok(out)
    }
}

fn type_filter(node_type: Option<NodeType>) -> impl Fn(&TaxonomyNode) -> bool + Send + Sync + 'static {
    move |n| node_type.is_none_or(|t| n.node_type() == t)
}

fn active_filter(active_only: bool) -> impl Fn(&TaxonomyNode) -> bool + Send + Sync + 'static {
    move |n| !active_only || n.is_active
}
