use tracing::{debug, info, instrument, warn};

use spm_core::{AggregateRoot, DomainError, NodeId};
use spm_events::EventBus;
use spm_taxonomy::event::{
    NodeCreated, NodeDeactivated, NodeDeleted, NodeMoved, NodeReactivated, NodeUpdated,
};
use spm_taxonomy::hierarchy::{self, CycleCheck, ParentValidation};
use spm_taxonomy::{
    Changes, CreateNode, NodePatch, NodeType, NodeUpdate, Placement, TaxonomyEvent, TaxonomyNode,
    add_change_history_entry,
};

use super::{Deactivation, Deletion, TaxonomyService};
use crate::error::ServiceResult;
use crate::store::{DocumentStore, StoreError};

const REASON_UPDATED: &str = "Node updated";
const REASON_MOVED: &str = "Node moved";
const REASON_DEACTIVATED: &str = "Node deactivated";
const REASON_CASCADE: &str = "Parent node deactivated";
const REASON_REACTIVATED: &str = "Node reactivated";

impl<S, B> TaxonomyService<S, B>
where
    S: DocumentStore<TaxonomyNode>,
    B: EventBus<TaxonomyEvent>,
{
    /// Check `(node_type, parent_id)` against the type rules and the stored
    /// parent. Returns the resulting placement.
    pub fn validate_hierarchy_rules(
        &self,
        node_type: NodeType,
        parent_id: Option<NodeId>,
    ) -> ServiceResult<Placement> {
        let placement = Placement::new(node_type, parent_id)?;
        self.validate_placement(&placement)?;
        Ok(placement)
    }

    fn validate_placement(&self, placement: &Placement) -> ServiceResult<()> {
        let parent = match placement.parent_id() {
            Some(parent_id) => self.nodes.get(parent_id)?,
            None => None,
        };
        hierarchy::validate_parent(placement, parent.as_ref())?;
        Ok(())
    }

    /// Read-only: could a `child_type` node hang under `parent_id`?
    pub fn validate_parent_child(
        &self,
        parent_id: NodeId,
        child_type: NodeType,
    ) -> ServiceResult<ParentValidation> {
        let result = match Placement::new(child_type, Some(parent_id)) {
            Ok(placement) => {
                let parent = self.nodes.get(parent_id)?;
                hierarchy::validate_parent(&placement, parent.as_ref())
            }
            Err(err) => Err(err),
        };
        Ok(ParentValidation::from_result(result))
    }

    /// Would making `candidate_parent` the parent of `node_id` close a loop?
    ///
    /// Walks up from the candidate. A walk that exceeds the configured step cap
    /// counts as a loop.
    pub fn check_circular_reference(
        &self,
        node_id: NodeId,
        candidate_parent: NodeId,
    ) -> ServiceResult<bool> {
        let outcome = hierarchy::detect_cycle(
            node_id,
            Some(candidate_parent),
            self.config.max_ancestor_walk,
            |id| -> Result<_, StoreError> { Ok(self.nodes.get(id)?.map(|n| n.parent_id())) },
        )?;
        if outcome == CycleCheck::Truncated {
            warn!(
                node_id = %node_id,
                candidate_parent = %candidate_parent,
                max_steps = self.config.max_ancestor_walk,
                "ancestor walk hit the step cap; treating as circular"
            );
        }
        Ok(outcome.blocks_write())
    }

    #[instrument(skip_all, fields(node_type = %cmd.node_type, actor = %cmd.created_by))]
    pub fn create(&self, cmd: CreateNode) -> ServiceResult<NodeId> {
        let (id, event) = self.insert_node(cmd)?;
        self.publish(event)?;
        Ok(id)
    }

    /// Validate and insert without publishing. Returns the notification to send.
    pub(super) fn insert_node(&self, cmd: CreateNode) -> ServiceResult<(NodeId, TaxonomyEvent)> {
        cmd.validate_fields()?;
        let placement = self.validate_hierarchy_rules(cmd.node_type, cmd.parent_id)?;

        let now = self.now();
        let name = cmd.name.clone();
        let record = cmd.into_record(placement, now);
        let actor = record.created_by.clone();
        let id = self.nodes.insert(record)?;

        info!(node_id = %id, node_type = %placement.node_type(), "node created");
        let event = TaxonomyEvent::NodeCreated(NodeCreated {
            node_id: id,
            node_type: placement.node_type(),
            parent_id: placement.parent_id(),
            name,
            actor,
            occurred_at: now,
        });
        Ok((id, event))
    }

    pub fn create_portfolio(&self, cmd: CreateNode) -> ServiceResult<NodeId> {
        self.create(CreateNode {
            node_type: NodeType::Portfolio,
            ..cmd
        })
    }

    pub fn create_line(&self, cmd: CreateNode) -> ServiceResult<NodeId> {
        self.create(CreateNode {
            node_type: NodeType::Line,
            ..cmd
        })
    }

    pub fn create_category(&self, cmd: CreateNode) -> ServiceResult<NodeId> {
        self.create(CreateNode {
            node_type: NodeType::Category,
            ..cmd
        })
    }

    /// Edit name, description, strategy and optionally the parent.
    #[instrument(skip_all, fields(node_id = %id, actor = updated_by))]
    pub fn update(
        &self,
        id: NodeId,
        update: NodeUpdate,
        updated_by: &str,
    ) -> ServiceResult<TaxonomyNode> {
        let node = self.load(id)?;
        update.validate_fields()?;

        let placement = if update.changes_parent(&node) {
            let new_parent = update.parent_id.flatten();
            let placement = node.placement.reparented(new_parent)?;
            if let Some(parent_id) = new_parent {
                if self.check_circular_reference(id, parent_id)? {
                    return Err(DomainError::validation(
                        "Cannot update parent: would create circular reference",
                    )
                    .into());
                }
            }
            self.validate_placement(&placement)?;
            Some(placement)
        } else {
            None
        };

        let changes = update.diff(&node)?;
        let now = self.now();
        let version = node.next_version();
        let history = add_change_history_entry(
            &node.change_history,
            updated_by,
            Changes::Fields(changes.clone()),
            Some(REASON_UPDATED),
            now,
        );
        let patch = NodePatch {
            name: update.name,
            description: update.description,
            strategy: update.strategy,
            placement,
            ..NodePatch::audited(version, history, updated_by, now)
        };
        self.nodes.patch(id, patch)?;

        info!(version, fields = changes.len(), "node updated");
        self.publish(TaxonomyEvent::NodeUpdated(NodeUpdated {
            node_id: id,
            changes,
            version,
            actor: updated_by.to_string(),
            occurred_at: now,
        }))?;
        self.load(id)
    }

    /// Re-parent a line or category.
    #[instrument(skip_all, fields(node_id = %id, new_parent = %new_parent_id, actor = moved_by))]
    pub fn move_node(
        &self,
        id: NodeId,
        new_parent_id: NodeId,
        moved_by: &str,
    ) -> ServiceResult<TaxonomyNode> {
        let node = self.load(id)?;
        if node.node_type() == NodeType::Portfolio {
            return Err(DomainError::validation("Portfolios cannot be moved - they must be top-level").into());
        }
        let old_parent_id = node.parent_id();
        if old_parent_id == Some(new_parent_id) {
            return Err(DomainError::validation("Node is already under this parent").into());
        }
        if self.check_circular_reference(id, new_parent_id)? {
            return Err(
                DomainError::validation("Cannot move node: would create circular reference").into(),
            );
        }
        let placement = node.placement.reparented(Some(new_parent_id))?;
        self.validate_placement(&placement)?;

        let now = self.now();
        let version = node.next_version();
        let history = add_change_history_entry(
            &node.change_history,
            moved_by,
            Changes::field("parent_id", &old_parent_id, &Some(new_parent_id)),
            Some(REASON_MOVED),
            now,
        );
        self.nodes.patch(
            id,
            NodePatch {
                placement: Some(placement),
                ..NodePatch::audited(version, history, moved_by, now)
            },
        )?;

        info!(version, "node moved");
        self.publish(TaxonomyEvent::NodeMoved(NodeMoved {
            node_id: id,
            old_parent_id,
            new_parent_id: Some(new_parent_id),
            version,
            actor: moved_by.to_string(),
            occurred_at: now,
        }))?;
        self.load(id)
    }

    /// Switch a node off, optionally together with every active descendant.
    ///
    /// Each descendant is its own commit; a store failure part-way leaves the
    /// earlier ones in place. Notifications go out once the writes are done, so
    /// a bus failure never cuts the cascade short.
    #[instrument(skip_all, fields(node_id = %id, cascade = cascade, actor = updated_by))]
    pub fn deactivate(&self, id: NodeId, cascade: bool, updated_by: &str) -> ServiceResult<Deactivation> {
        let node = self.load(id)?;
        if !node.is_active {
            return Err(DomainError::AlreadyInactive.into());
        }

        let mut events = Vec::new();
        let written = self.deactivate_subtree(&node, cascade, updated_by, &mut events);
        let published = self.publish_all(events);
        let deactivated_count = written?;
        published?;

        info!(deactivated_count, "node deactivated");
        Ok(Deactivation { deactivated_count })
    }

    fn deactivate_subtree(
        &self,
        node: &TaxonomyNode,
        cascade: bool,
        updated_by: &str,
        events: &mut Vec<TaxonomyEvent>,
    ) -> ServiceResult<usize> {
        self.set_active(node, false, REASON_DEACTIVATED, updated_by)?;
        events.push(self.deactivated_event(node, false, updated_by));
        let mut count = 1;
        if !cascade {
            return Ok(count);
        }

        for child in self.descendants(node.id)? {
            if !child.is_active {
                debug!(node_id = %child.id, "descendant already inactive");
                continue;
            }
            self.set_active(&child, false, REASON_CASCADE, updated_by)?;
            events.push(self.deactivated_event(&child, true, updated_by));
            count += 1;
        }
        Ok(count)
    }

    fn deactivated_event(&self, node: &TaxonomyNode, cascaded: bool, updated_by: &str) -> TaxonomyEvent {
        TaxonomyEvent::NodeDeactivated(NodeDeactivated {
            node_id: node.id,
            cascaded,
            version: node.next_version(),
            actor: updated_by.to_string(),
            occurred_at: self.now(),
        })
    }

    /// Switch an inactive node back on. Its parent, if any, must be active.
    #[instrument(skip_all, fields(node_id = %id, actor = updated_by))]
    pub fn reactivate(&self, id: NodeId, updated_by: &str) -> ServiceResult<TaxonomyNode> {
        let node = self.load(id)?;
        if node.is_active {
            return Err(DomainError::AlreadyActive.into());
        }
        if let Some(parent_id) = node.parent_id() {
            let parent_active = self.nodes.get(parent_id)?.is_some_and(|p| p.is_active);
            if !parent_active {
                return Err(DomainError::ParentInactive.into());
            }
        }

        self.set_active(&node, true, REASON_REACTIVATED, updated_by)?;
        info!(version = node.next_version(), "node reactivated");
        self.publish(TaxonomyEvent::NodeReactivated(NodeReactivated {
            node_id: id,
            version: node.next_version(),
            actor: updated_by.to_string(),
            occurred_at: self.now(),
        }))?;
        self.load(id)
    }

    /// Hard delete. With `force`, descendants go first, children before parents.
    #[instrument(skip_all, fields(node_id = %id, force = force, actor = deleted_by))]
    pub fn delete_node(&self, id: NodeId, force: bool, deleted_by: &str) -> ServiceResult<Deletion> {
        let node = self.load(id)?;
        let mut events = Vec::new();
        let written = self.remove_subtree(node, force, deleted_by, &mut events);
        let published = self.publish_all(events);
        let deleted_count = written?;
        published?;

        info!(deleted_count, "node deleted");
        Ok(Deletion { deleted_count })
    }

    /// Delete `node` (and, when forced, its subtree) without publishing.
    /// Pushes one notification per removed node.
    pub(super) fn remove_subtree(
        &self,
        node: TaxonomyNode,
        force: bool,
        deleted_by: &str,
        events: &mut Vec<TaxonomyEvent>,
    ) -> ServiceResult<usize> {
        let has_children = !self.children_of(node.id)?.is_empty();
        if has_children && !force {
            return Err(DomainError::HasChildren.into());
        }

        let mut doomed = if has_children { self.descendants(node.id)? } else { Vec::new() };
        // Reverse pre-order puts every child ahead of its parent.
        doomed.reverse();
        doomed.push(node);

        let mut deleted = 0;
        for victim in doomed {
            self.nodes.delete(victim.id)?;
            deleted += 1;
            events.push(TaxonomyEvent::NodeDeleted(NodeDeleted {
                node_id: victim.id,
                node_type: victim.node_type(),
                parent_id: victim.parent_id(),
                actor: deleted_by.to_string(),
                occurred_at: self.now(),
            }));
        }
        Ok(deleted)
    }

    fn set_active(
        &self,
        node: &TaxonomyNode,
        active: bool,
        reason: &str,
        updated_by: &str,
    ) -> ServiceResult<()> {
        let now = self.now();
        let history = add_change_history_entry(
            &node.change_history,
            updated_by,
            Changes::field("is_active", &node.is_active, &active),
            Some(reason),
            now,
        );
        self.nodes.patch(
            node.id,
            NodePatch {
                is_active: Some(active),
                ..NodePatch::audited(node.next_version(), history, updated_by, now)
            },
        )?;
        Ok(())
    }
}
