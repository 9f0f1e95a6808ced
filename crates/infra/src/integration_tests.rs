//! End-to-end tests for the taxonomy service over the in-memory store and bus.
//!
//! Verifies:
//! - Hierarchy rules hold across create, update, move and delete
//! - Every committed mutation bumps the version and appends history
//! - Cascades commit per node, so a failure part-way keeps earlier writes
//! - Notifications follow commits

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use spm_core::{DomainError, FixedClock, NodeId};
    use spm_events::{Event, EventBus, InMemoryEventBus, Subscription};
    use spm_taxonomy::{
        Changes, ConsistencyCheck, CreateNode, ExportData, ExportFormat, ImportNode, IssueKind,
        NodeType, NodeUpdate, Placement, TaxonomyEvent, TaxonomyNode,
    };

    use crate::config::SpmConfig;
    use crate::error::ServiceError;
    use crate::store::{DocumentStore, NodeStore, Query, StoreError};
    use crate::taxonomy::{CheckScope, TaxonomyService};

    type Bus = Arc<InMemoryEventBus<TaxonomyEvent>>;
    type Service = TaxonomyService<Arc<NodeStore>, Bus>;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn setup() -> (Service, Arc<NodeStore>, Bus) {
        let store = Arc::new(NodeStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let service = TaxonomyService::new(store.clone(), bus.clone()).with_clock(FixedClock(t0()));
        (service, store, bus)
    }

    /// Portfolio > line > category.
    fn seed_tree<B: EventBus<TaxonomyEvent>>(
        service: &TaxonomyService<Arc<NodeStore>, B>,
    ) -> (NodeId, NodeId, NodeId) {
        let p = service
            .create(CreateNode::portfolio("Technology Infrastructure", "Shared technology platforms", "alice"))
            .unwrap();
        let l = service
            .create(CreateNode::line(p, "Cloud Platform", "Hosted platform services", "alice"))
            .unwrap();
        let c = service
            .create(CreateNode::category(l, "Database Services", "Managed database hosting and tuning", "alice"))
            .unwrap();
        (p, l, c)
    }

    fn domain(err: ServiceError) -> DomainError {
        err.as_domain().cloned().unwrap()
    }

    fn node(store: &NodeStore, id: NodeId) -> TaxonomyNode {
        store.get(id).unwrap().unwrap()
    }

    #[test]
    fn create_portfolio_starts_at_version_one() {
        let (service, store, _) = setup();
        let id = service
            .create(CreateNode::portfolio("Core", "Core business portfolio", "alice"))
            .unwrap();

        let stored = node(&store, id);
        assert_eq!(stored.version, 1);
        assert!(stored.is_active);
        assert_eq!(stored.placement, Placement::Portfolio);
        assert_eq!(stored.created_by, "alice");
        assert_eq!(stored.updated_by, "alice");
        assert_eq!(stored.last_modified, t0());
        assert_eq!(stored.change_history.len(), 1);
        assert_eq!(stored.change_history[0].changes, Changes::Created);
        assert_eq!(stored.change_history[0].reason.as_deref(), Some("Portfolio creation"));
    }

    #[test]
    fn line_requires_portfolio_parent() {
        let (service, store, _) = setup();
        let (p, l, _) = seed_tree(&service);

        let err = service
            .create(CreateNode::new(NodeType::Line, None, "Orphan", "Line without a parent", "alice"))
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));

        let err = service
            .create(CreateNode::line(l, "Nested", "Line under a line", "alice"))
            .unwrap_err();
        assert_eq!(
            domain(err),
            DomainError::validation("Product line must have portfolio parent")
        );

        let err = service
            .create(CreateNode::line(NodeId::new(), "Ghost", "Line under nothing", "alice"))
            .unwrap_err();
        assert_eq!(domain(err), DomainError::validation("Parent node not found"));

        service
            .create(CreateNode::line(p, "Edge", "Edge computing line", "alice"))
            .unwrap();
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn portfolio_cannot_be_moved() {
        let (service, store, _) = setup();
        let (p, l, _) = seed_tree(&service);
        let before = node(&store, p);

        let err = service.move_node(p, l, "bob").unwrap_err();
        assert_eq!(
            domain(err),
            DomainError::validation("Portfolios cannot be moved - they must be top-level")
        );
        assert_eq!(node(&store, p), before);
    }

    #[test]
    fn circular_reference_detection() {
        let (service, _, _) = setup();
        let (p, l, c) = seed_tree(&service);

        assert!(service.check_circular_reference(p, c).unwrap());
        assert!(service.check_circular_reference(l, c).unwrap());
        assert!(service.check_circular_reference(c, c).unwrap());
        assert!(!service.check_circular_reference(c, l).unwrap());
        assert!(!service.check_circular_reference(l, p).unwrap());
    }

    #[test]
    fn ancestor_walk_over_the_cap_blocks_a_move() {
        let (service, store, bus) = setup();
        let (p, _, c) = seed_tree(&service);
        let l2 = service
            .create(CreateNode::line(p, "Data Platform", "Analytics platform line", "alice"))
            .unwrap();

        let capped = TaxonomyService::new(store.clone(), bus).with_config(SpmConfig {
            max_ancestor_walk: 1,
            ..SpmConfig::default()
        });
        assert!(capped.check_circular_reference(c, l2).unwrap());
        let err = capped.move_node(c, l2, "bob").unwrap_err();
        assert_eq!(
            domain(err),
            DomainError::validation("Cannot move node: would create circular reference")
        );

        service.move_node(c, l2, "bob").unwrap();
        assert_eq!(node(&store, c).parent_id(), Some(l2));
    }

    #[test]
    fn move_records_parent_change() {
        let (service, store, _) = setup();
        let (p, l, c) = seed_tree(&service);
        let l2 = service
            .create(CreateNode::line(p, "Data Platform", "Analytics platform line", "alice"))
            .unwrap();

        let err = service.move_node(c, l, "bob").unwrap_err();
        assert_eq!(domain(err), DomainError::validation("Node is already under this parent"));

        let err = service.move_node(c, p, "bob").unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));

        let moved = service.move_node(c, l2, "bob").unwrap();
        assert_eq!(moved.parent_id(), Some(l2));
        assert_eq!(moved.version, 2);
        assert_eq!(moved.updated_by, "bob");
        let last = moved.change_history.last().unwrap();
        assert_eq!(last.reason.as_deref(), Some("Node moved"));
        assert!(last.changes.get("parent_id").is_some());
        assert_eq!(node(&store, c), moved);
    }

    #[test]
    fn cascade_deactivation_switches_off_the_subtree() {
        let (service, store, _) = setup();
        let (p, l, c) = seed_tree(&service);

        let outcome = service.deactivate(p, true, "bob").unwrap();
        assert_eq!(outcome.deactivated_count, 3);
        for id in [p, l, c] {
            let n = node(&store, id);
            assert!(!n.is_active);
            assert_eq!(n.version, 2);
            assert_eq!(n.updated_by, "bob");
        }
        assert_eq!(
            node(&store, c).change_history.last().unwrap().reason.as_deref(),
            Some("Parent node deactivated")
        );

        let err = service.deactivate(p, true, "bob").unwrap_err();
        assert_eq!(domain(err), DomainError::AlreadyInactive);
    }

    #[test]
    fn cascade_skips_inactive_descendants_but_reaches_below_them() {
        let (service, store, _) = setup();
        let (p, l, c) = seed_tree(&service);
        service.deactivate(l, false, "bob").unwrap();
        let line_before = node(&store, l);
        assert!(node(&store, c).is_active);

        let outcome = service.deactivate(p, true, "carol").unwrap();
        assert_eq!(outcome.deactivated_count, 2);
        assert_eq!(node(&store, l), line_before);
        assert!(!node(&store, c).is_active);
    }

    #[test]
    fn deactivate_without_cascade_leaves_children() {
        let (service, store, _) = setup();
        let (p, l, _) = seed_tree(&service);

        let outcome = service.deactivate(p, false, "bob").unwrap();
        assert_eq!(outcome.deactivated_count, 1);
        assert!(node(&store, l).is_active);
    }

    #[test]
    fn reactivate_requires_active_parent() {
        let (service, store, _) = setup();
        let (p, l, _) = seed_tree(&service);

        assert_eq!(
            domain(service.reactivate(l, "bob").unwrap_err()),
            DomainError::AlreadyActive
        );

        service.deactivate(p, true, "bob").unwrap();
        assert_eq!(
            domain(service.reactivate(l, "bob").unwrap_err()),
            DomainError::ParentInactive
        );

        service.reactivate(p, "bob").unwrap();
        let line = service.reactivate(l, "bob").unwrap();
        assert!(line.is_active);
        assert_eq!(line.version, 3);
        assert_eq!(node(&store, l), line);
    }

    #[test]
    fn delete_refuses_parents_unless_forced() {
        let (service, store, _) = setup();
        let (p, l, c) = seed_tree(&service);
        let snapshot = store.collect(&Query::all()).unwrap();

        let err = service.delete_node(l, false, "bob").unwrap_err();
        assert_eq!(domain(err), DomainError::HasChildren);
        assert_eq!(store.collect(&Query::all()).unwrap(), snapshot);

        let outcome = service.delete_node(l, true, "bob").unwrap();
        assert_eq!(outcome.deleted_count, 2);
        assert!(store.get(l).unwrap().is_none());
        assert!(store.get(c).unwrap().is_none());
        assert!(store.get(p).unwrap().is_some());

        let leaf = service.create(CreateNode::line(p, "Edge", "Edge computing line", "bob")).unwrap();
        assert_eq!(service.delete_node(leaf, false, "bob").unwrap().deleted_count, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_nodes_are_not_found() {
        let (service, _, _) = setup();
        let ghost = NodeId::new();
        for err in [
            service.update(ghost, NodeUpdate::new().name("Renamed"), "bob").unwrap_err(),
            service.deactivate(ghost, true, "bob").unwrap_err(),
            service.reactivate(ghost, "bob").unwrap_err(),
            service.delete_node(ghost, true, "bob").unwrap_err(),
        ] {
            assert!(matches!(domain(err), DomainError::NotFound(_)));
        }
    }

    #[test]
    fn version_tracks_committed_mutations() {
        let (service, store, _) = setup();
        let (p, _, c) = seed_tree(&service);
        let l2 = service
            .create(CreateNode::line(p, "Data Platform", "Analytics platform line", "alice"))
            .unwrap();

        service.update(c, NodeUpdate::new().name("Databases"), "bob").unwrap();
        service
            .update(c, NodeUpdate::new().strategy(Some("Consolidate engines".into())), "bob")
            .unwrap();
        service.move_node(c, l2, "bob").unwrap();
        service.deactivate(c, false, "bob").unwrap();
        service.reactivate(c, "bob").unwrap();

        let stored = node(&store, c);
        assert_eq!(stored.version, 1 + 5);
        assert_eq!(stored.change_history.len(), 1 + 5);
        assert_eq!(stored.name, "Databases");
        assert_eq!(stored.strategy.as_deref(), Some("Consolidate engines"));
    }

    #[test]
    fn repeated_update_is_no_changes() {
        let (service, store, _) = setup();
        let (_, l, _) = seed_tree(&service);
        let update = NodeUpdate::new().name("Cloud Services").description("Hosted cloud services");

        let updated = service.update(l, update.clone(), "bob").unwrap();
        assert_eq!(updated.version, 2);
        let entry = updated.change_history.last().unwrap();
        assert_eq!(entry.reason.as_deref(), Some("Node updated"));
        assert!(entry.changes.get("name").is_some());
        assert!(entry.changes.get("description").is_some());

        let err = service.update(l, update, "bob").unwrap_err();
        assert_eq!(domain(err), DomainError::NoChanges);
        assert_eq!(node(&store, l), updated);
    }

    #[test]
    fn update_validates_fields_and_parent() {
        let (service, store, _) = setup();
        let (p, l, c) = seed_tree(&service);
        let before = node(&store, c);

        let err = service.update(c, NodeUpdate::new().name("x"), "bob").unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));

        let err = service.update(c, NodeUpdate::new().parent(Some(p)), "bob").unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));

        let err = service.update(c, NodeUpdate::new().parent(None), "bob").unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));
        assert_eq!(node(&store, c), before);

        let err = service.update(p, NodeUpdate::new().parent(Some(l)), "bob").unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));
    }

    #[test]
    fn validate_parent_child_reports_without_failing() {
        let (service, _, _) = setup();
        let (p, l, c) = seed_tree(&service);

        assert!(service.validate_parent_child(p, NodeType::Line).unwrap().valid);
        assert!(service.validate_parent_child(l, NodeType::Category).unwrap().valid);

        let report = service.validate_parent_child(c, NodeType::Category).unwrap();
        assert!(!report.valid);
        assert_eq!(report.reason.as_deref(), Some("Category must have product line parent"));

        assert!(!service.validate_parent_child(p, NodeType::Portfolio).unwrap().valid);
        assert!(!service.validate_parent_child(NodeId::new(), NodeType::Line).unwrap().valid);
    }

    #[test]
    fn mutations_publish_after_commit() {
        let (service, _, bus) = setup();
        let sub = bus.subscribe();
        let (p, l, c) = seed_tree(&service);
        service.update(c, NodeUpdate::new().name("Databases"), "bob").unwrap();
        service.deactivate(l, true, "bob").unwrap();
        service.delete_node(p, true, "bob").unwrap();

        let events = sub.drain();
        let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            kinds,
            vec![
                "taxonomy.node.created",
                "taxonomy.node.created",
                "taxonomy.node.created",
                "taxonomy.node.updated",
                "taxonomy.node.deactivated",
                "taxonomy.node.deactivated",
                "taxonomy.node.deleted",
                "taxonomy.node.deleted",
                "taxonomy.node.deleted",
            ]
        );
        assert!(events.iter().all(|e| e.occurred_at() == t0()));
        // Children go before parents.
        let deleted: Vec<NodeId> = events[6..].iter().map(TaxonomyEvent::node_id).collect();
        assert_eq!(deleted, vec![c, l, p]);
    }

    /// Bus that accepts a fixed number of messages, then refuses the rest.
    #[derive(Debug)]
    struct FlakyBus {
        accepts_left: AtomicUsize,
        refused: AtomicUsize,
    }

    impl FlakyBus {
        fn new(accepts: usize) -> Self {
            Self {
                accepts_left: AtomicUsize::new(accepts),
                refused: AtomicUsize::new(0),
            }
        }
    }

    impl EventBus<TaxonomyEvent> for FlakyBus {
        type Error = &'static str;

        fn publish(&self, _message: TaxonomyEvent) -> Result<(), Self::Error> {
            let left = self.accepts_left.load(Ordering::SeqCst);
            if left == 0 {
                self.refused.fetch_add(1, Ordering::SeqCst);
                return Err("bus closed");
            }
            self.accepts_left.store(left - 1, Ordering::SeqCst);
            Ok(())
        }

        fn subscribe(&self) -> Subscription<TaxonomyEvent> {
            Subscription::new(mpsc::channel().1)
        }
    }

    fn flaky_setup(accepts: usize) -> (TaxonomyService<Arc<NodeStore>, Arc<FlakyBus>>, Arc<NodeStore>, Arc<FlakyBus>) {
        let store = Arc::new(NodeStore::new());
        let bus = Arc::new(FlakyBus::new(accepts));
        let service = TaxonomyService::new(store.clone(), bus.clone()).with_clock(FixedClock(t0()));
        (service, store, bus)
    }

    #[test]
    fn publish_failure_surfaces_after_the_write_lands() {
        let (service, store, _) = flaky_setup(0);

        let err = service
            .create(CreateNode::portfolio("Core", "Core business portfolio", "alice"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Publish(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn bus_failure_does_not_cut_a_cascade_short() {
        let (service, store, bus) = flaky_setup(3);
        let (p, l, c) = seed_tree(&service);

        let err = service.deactivate(p, true, "bob").unwrap_err();
        assert!(matches!(err, ServiceError::Publish(_)));
        for id in [p, l, c] {
            assert!(!node(&store, id).is_active);
        }
        // Every notification was still attempted.
        assert_eq!(bus.refused.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn bus_failure_does_not_cut_a_forced_delete_short() {
        let (service, store, bus) = flaky_setup(4);
        let (p, _, _) = seed_tree(&service);

        let err = service.delete_node(p, true, "bob").unwrap_err();
        assert!(matches!(err, ServiceError::Publish(_)));
        assert!(store.is_empty());
        assert_eq!(bus.refused.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn imported_rows_count_as_created_when_the_bus_is_down() {
        let (service, store, _) = flaky_setup(0);
        let rows = vec![
            ImportNode::new(NodeType::Portfolio, "Core", "Core business portfolio", None),
            ImportNode::new(NodeType::Line, "Cloud", "Cloud platform line", Some("Core")),
        ];

        let report = service.bulk_import(&rows, "importer");
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn orphan_cleanup_finishes_when_the_bus_is_down() {
        let (service, store, _) = flaky_setup(3);
        let (p, _, _) = seed_tree(&service);
        store.delete(p).unwrap();

        let err = service.cleanup_orphaned_nodes("janitor", false).unwrap_err();
        assert!(matches!(err, ServiceError::Publish(_)));
        assert!(store.is_empty());
    }

    /// Node store whose patches start failing after a fixed budget.
    struct FlakyStore {
        inner: NodeStore,
        patches_left: AtomicUsize,
    }

    impl DocumentStore<TaxonomyNode> for FlakyStore {
        fn get(&self, id: NodeId) -> Result<Option<TaxonomyNode>, StoreError> {
            self.inner.get(id)
        }

        fn insert(&self, record: spm_taxonomy::NewTaxonomyNode) -> Result<NodeId, StoreError> {
            self.inner.insert(record)
        }

        fn patch(&self, id: NodeId, patch: spm_taxonomy::NodePatch) -> Result<(), StoreError> {
            let left = self.patches_left.load(Ordering::SeqCst);
            if left == 0 {
                return Err(StoreError::Backend("injected failure".into()));
            }
            self.patches_left.store(left - 1, Ordering::SeqCst);
            self.inner.patch(id, patch)
        }

        fn delete(&self, id: NodeId) -> Result<(), StoreError> {
            self.inner.delete(id)
        }

        fn collect(&self, query: &Query<TaxonomyNode>) -> Result<Vec<TaxonomyNode>, StoreError> {
            self.inner.collect(query)
        }
    }

    #[test]
    fn failed_cascade_keeps_earlier_commits() {
        let store = Arc::new(FlakyStore {
            inner: NodeStore::new(),
            patches_left: AtomicUsize::new(usize::MAX),
        });
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let service = TaxonomyService::new(store.clone(), bus).with_clock(FixedClock(t0()));
        let p = service
            .create(CreateNode::portfolio("Core", "Core business portfolio", "alice"))
            .unwrap();
        let l = service.create(CreateNode::line(p, "Cloud", "Cloud platform line", "alice")).unwrap();
        let c = service.create(CreateNode::category(l, "Compute", "Compute services", "alice")).unwrap();

        store.patches_left.store(2, Ordering::SeqCst);
        let err = service.deactivate(p, true, "bob").unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Backend(_))));

        assert!(!store.get(p).unwrap().unwrap().is_active);
        assert!(!store.get(l).unwrap().unwrap().is_active);
        assert!(store.get(c).unwrap().unwrap().is_active);
    }

    #[test]
    fn queries_filter_by_type_parent_and_state() {
        let (service, _, _) = setup();
        let (p, l, c) = seed_tree(&service);
        let p2 = service
            .create(CreateNode::portfolio("Business Apps", "Line-of-business applications", "bob"))
            .unwrap();
        let l2 = service.create(CreateNode::line(p2, "CRM", "Customer relationship tools", "bob")).unwrap();
        service.deactivate(p2, true, "bob").unwrap();

        assert_eq!(service.get_portfolios(false).unwrap().len(), 2);
        assert_eq!(service.get_portfolios(true).unwrap().len(), 1);
        assert_eq!(service.get_lines(Some(p), false).unwrap()[0].id, l);
        assert_eq!(service.get_lines(None, false).unwrap().len(), 2);
        assert!(service.get_lines(None, true).unwrap().iter().all(|n| n.id != l2));
        assert_eq!(service.get_categories(Some(l), true).unwrap()[0].id, c);
        assert_eq!(service.get_children(p, None, false).unwrap().len(), 1);
        assert!(service.get_children(p, Some(NodeType::Category), false).unwrap().is_empty());
        assert_eq!(service.get_top_level(false).unwrap().len(), 2);
        assert_eq!(service.get_by_creator("bob", None).unwrap().len(), 2);
        assert_eq!(service.get_by_creator("alice", Some(NodeType::Line)).unwrap()[0].id, l);
        assert_eq!(service.get_by_name("CRM", Some(NodeType::Line)).unwrap().unwrap().id, l2);
        assert!(service.get_by_name("CRM", Some(NodeType::Category)).unwrap().is_none());
        assert!(service.get_by_id(NodeId::new()).unwrap().is_none());
    }

    #[test]
    fn recently_updated_uses_the_clock() {
        let (service, store, bus) = setup();
        seed_tree(&service);

        let later = TaxonomyService::new(store.clone(), bus).with_clock(FixedClock(t0() + Duration::hours(30)));
        assert!(later.get_recently_updated(None, None).unwrap().is_empty());
        assert_eq!(later.get_recently_updated(Some(48), None).unwrap().len(), 3);
        assert_eq!(
            later.get_recently_updated(Some(48), Some(NodeType::Category)).unwrap().len(),
            1
        );
        assert_eq!(service.get_recently_updated(Some(1), None).unwrap().len(), 3);
    }

    #[test]
    fn breadcrumb_runs_root_first() {
        let (service, store, _) = setup();
        let (p, l, c) = seed_tree(&service);

        let ids: Vec<NodeId> = service.get_breadcrumb(c).unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![p, l, c]);
        assert!(service.get_breadcrumb(NodeId::new()).unwrap().is_empty());

        store.delete(p).unwrap();
        let ids: Vec<NodeId> = service.get_breadcrumb(c).unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![l, c]);
    }

    #[test]
    fn full_hierarchy_nests_and_filters() {
        let (service, _, _) = setup();
        let (p, l, _) = seed_tree(&service);
        service.create(CreateNode::category(l, "Storage", "Block and object storage", "alice")).unwrap();

        let forest = service.get_full_hierarchy(false).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].node.id, p);
        assert_eq!(forest[0].size(), 4);
        assert_eq!(forest[0].children[0].children.len(), 2);

        service.deactivate(l, true, "bob").unwrap();
        let forest = service.get_full_hierarchy(true).unwrap();
        assert_eq!(forest[0].size(), 1);
    }

    #[test]
    fn search_matches_name_and_description() {
        let (service, _, _) = setup();
        let (_, l, _) = seed_tree(&service);

        assert_eq!(service.search("cloud", None, false).unwrap()[0].id, l);
        assert_eq!(service.search("HOSTING", None, false).unwrap().len(), 1);
        assert_eq!(service.search("platform", None, false).unwrap().len(), 2);
        assert_eq!(
            service.search("platform", Some(NodeType::Portfolio), false).unwrap().len(),
            1
        );
        service.deactivate(l, false, "bob").unwrap();
        assert!(service.search("cloud", None, true).unwrap().is_empty());
    }

    #[test]
    fn empty_search_term_returns_the_filtered_set() {
        let (service, _, _) = setup();
        let (_, l, c) = seed_tree(&service);
        service.deactivate(c, false, "bob").unwrap();

        assert_eq!(service.search("", None, false).unwrap().len(), 3);
        assert_eq!(service.search("", None, true).unwrap().len(), 2);
        assert_eq!(service.search("", Some(NodeType::Line), true).unwrap()[0].id, l);
        // Whitespace is matched literally.
        assert_eq!(service.search(" ", Some(NodeType::Category), false).unwrap()[0].id, c);
        assert!(service.search("  ", None, false).unwrap().is_empty());
    }

    #[test]
    fn bulk_import_resolves_parents_by_name() {
        let (service, _, _) = setup();
        seed_tree(&service);

        let rows = vec![
            ImportNode::new(NodeType::Category, "Caching", "In-memory cache services", Some("Edge")),
            ImportNode::new(NodeType::Line, "Edge", "Edge computing line", Some("Technology Infrastructure")),
            ImportNode::new(NodeType::Category, "Queues", "Message queue services", Some("Cloud Platform")),
            ImportNode::new(NodeType::Category, "Lost", "Category with no line", Some("Nowhere")),
            ImportNode::new(NodeType::Portfolio, "Rogue", "Portfolio with a parent", Some("Edge")),
        ];
        let report = service.bulk_import(&rows, "importer");

        assert_eq!(report.total_processed, 5);
        assert_eq!(report.success_count, 3);
        assert_eq!(report.error_count, 2);
        let lost = report.results.iter().find(|r| r.name == "Lost").unwrap();
        assert!(!lost.success);
        assert!(lost.error.as_deref().unwrap().contains("Parent line 'Nowhere' not found"));

        let caching = service.get_by_name("Caching", Some(NodeType::Category)).unwrap().unwrap();
        let edge = service.get_by_name("Edge", Some(NodeType::Line)).unwrap().unwrap();
        assert_eq!(caching.parent_id(), Some(edge.id));
        assert_eq!(caching.created_by, "importer");
    }

    #[test]
    fn bulk_export_carries_paths() {
        let (service, _, _) = setup();
        let (p, l, _) = seed_tree(&service);
        let l2 = service
            .create(CreateNode::line(p, "Data Platform", "Analytics platform line", "alice"))
            .unwrap();
        service.deactivate(l2, false, "bob").unwrap();

        let export = service.bulk_export(ExportFormat::Json, false, None).unwrap();
        assert_eq!(export.count, 3);
        let ExportData::Json { rows } = &export.data else {
            panic!("expected json rows");
        };
        assert_eq!(
            rows[2].hierarchy_path,
            "Technology Infrastructure > Cloud Platform > Database Services"
        );
        assert_eq!(rows[1].node.id, l);

        let export = service.bulk_export(ExportFormat::Csv, true, Some(NodeType::Line)).unwrap();
        assert_eq!(export.count, 2);
        let ExportData::Csv { headers, rows } = &export.data else {
            panic!("expected csv rows");
        };
        assert_eq!(headers.len(), 9);
        assert_eq!(rows[0][0], "Cloud Platform");
        assert_eq!(rows[0][4], "Technology Infrastructure");
    }

    #[test]
    fn tree_metrics_for_table_and_subtree() {
        let (service, _, _) = setup();
        let (p, l, _) = seed_tree(&service);
        service
            .create(CreateNode::category(l, "Storage", "Block and object storage", "alice").with_strategy("Tier by cost"))
            .unwrap();
        service.deactivate(l, false, "bob").unwrap();

        let all = service.calculate_tree_metrics(None).unwrap();
        assert_eq!(all.total_nodes, 4);
        assert_eq!(all.active_nodes, 3);
        assert_eq!(all.inactive_nodes, 1);
        assert_eq!(all.max_depth, 2);
        assert_eq!(all.nodes_with_strategy, 1);
        assert_eq!(all.orphaned_nodes, 0);

        let subtree = service.calculate_tree_metrics(Some(l)).unwrap();
        assert_eq!(subtree.total_nodes, 3);
        assert_eq!(subtree.max_depth, 1);
        assert_eq!(subtree.orphaned_nodes, 0);
        assert_eq!(service.calculate_tree_metrics(Some(p)).unwrap().total_nodes, 4);

        assert!(matches!(
            domain(service.calculate_tree_metrics(Some(NodeId::new())).unwrap_err()),
            DomainError::NotFound(_)
        ));
    }

    #[test]
    fn orphan_cleanup_removes_dangling_subtrees() {
        let (service, store, _) = setup();
        let (p, l, c) = seed_tree(&service);
        store.delete(p).unwrap();

        let dry = service.cleanup_orphaned_nodes("janitor", true).unwrap();
        assert!(dry.dry_run);
        assert_eq!(dry.orphans.len(), 1);
        assert_eq!(dry.orphans[0].node_id, l);
        assert_eq!(dry.orphans[0].missing_parent_id, p);
        assert_eq!(dry.removed_count, 0);
        assert_eq!(store.len(), 2);

        let real = service.cleanup_orphaned_nodes("janitor", false).unwrap();
        assert_eq!(real.removed_count, 2);
        assert!(store.get(c).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn consistency_checks_find_corruption() {
        let (service, store, _) = setup();
        let (p, l, c) = seed_tree(&service);
        for check in ConsistencyCheck::ALL {
            assert!(service.run_consistency_check(check, CheckScope::All).unwrap().is_clean());
        }

        // Line pointing at its own category closes a loop.
        let mut looped = node(&store, l);
        looped.placement = Placement::Line { parent_id: c };
        store.seed(looped).unwrap();

        let report = service
            .run_consistency_check(ConsistencyCheck::CircularReference, CheckScope::All)
            .unwrap();
        assert_eq!(report.nodes_checked, 3);
        assert!(report.issues.iter().any(|i| i.kind == IssueKind::CircularReference));

        let report = service
            .run_consistency_check(ConsistencyCheck::HierarchyIntegrity, CheckScope::Subtree(l))
            .unwrap();
        assert!(report.issues.iter().any(|i| i.node_id == l && i.kind == IssueKind::InvalidParentType));

        let scoped = service
            .run_consistency_check(ConsistencyCheck::HierarchyIntegrity, CheckScope::Subtree(p))
            .unwrap();
        assert_eq!(scoped.nodes_checked, 1);
        assert!(scoped.is_clean());

        assert!(matches!(
            domain(
                service
                    .run_consistency_check(ConsistencyCheck::OrphanedNodes, CheckScope::Subtree(NodeId::new()))
                    .unwrap_err()
            ),
            DomainError::NotFound(_)
        ));
    }

    #[test]
    fn suggestions_rank_matching_category_first() {
        let (service, _, _) = setup();
        let (_, l, c) = seed_tree(&service);
        service
            .create(CreateNode::category(l, "Mobile Apps", "Native apps for phones", "alice"))
            .unwrap();

        let result = service
            .suggest_category("Postgres database cluster", Some("Replicated relational storage"))
            .unwrap();
        assert_eq!(result.total_categories, 2);
        assert_eq!(result.suggestions[0].taxonomy_node_id, c);
        assert_eq!(result.suggestions[0].portfolio, "Technology Infrastructure");
        assert!(result.suggestions[0].confidence <= 0.95);

        assert!(matches!(
            domain(service.suggest_category(" ", None).unwrap_err()),
            DomainError::Validation(_)
        ));
    }

    #[derive(Debug, Clone)]
    enum Op {
        AddLine(usize),
        AddCategory(usize),
        Move(usize, usize),
        Deactivate(usize),
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8).prop_map(Op::AddLine),
            (0usize..16).prop_map(Op::AddCategory),
            (0usize..16, 0usize..8).prop_map(|(a, b)| Op::Move(a, b)),
            (0usize..24).prop_map(Op::Deactivate),
            (0usize..24).prop_map(Op::Delete),
        ]
    }

    fn pick(nodes: &[TaxonomyNode], node_type: NodeType, i: usize) -> Option<NodeId> {
        let of_type: Vec<&TaxonomyNode> = nodes.iter().filter(|n| n.node_type() == node_type).collect();
        (!of_type.is_empty()).then(|| of_type[i % of_type.len()].id)
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 32, ..ProptestConfig::default() })]

        #[test]
        fn random_operations_keep_the_tree_well_formed(ops in proptest::collection::vec(op(), 1..40)) {
            let (service, store, _) = setup();
            service.create(CreateNode::portfolio("Alpha", "First portfolio", "fuzz")).unwrap();
            service.create(CreateNode::portfolio("Beta", "Second portfolio", "fuzz")).unwrap();

            for (n, op) in ops.into_iter().enumerate() {
                let nodes = store.collect(&Query::all()).unwrap();
                // Rule violations are expected; only the resulting shape matters.
                let _ = match op {
                    Op::AddLine(i) => pick(&nodes, NodeType::Portfolio, i).map(|p| {
                        service.create(CreateNode::line(p, format!("Line {n}"), "Generated line", "fuzz")).map(|_| ())
                    }),
                    Op::AddCategory(i) => pick(&nodes, NodeType::Line, i).map(|l| {
                        service.create(CreateNode::category(l, format!("Category {n}"), "Generated category", "fuzz")).map(|_| ())
                    }),
                    Op::Move(a, b) => pick(&nodes, NodeType::Category, a)
                        .zip(pick(&nodes, NodeType::Line, b))
                        .map(|(c, l)| service.move_node(c, l, "fuzz").map(|_| ())),
                    Op::Deactivate(i) => (!nodes.is_empty())
                        .then(|| service.deactivate(nodes[i % nodes.len()].id, true, "fuzz").map(|_| ())),
                    Op::Delete(i) => (!nodes.is_empty())
                        .then(|| service.delete_node(nodes[i % nodes.len()].id, true, "fuzz").map(|_| ())),
                };
            }

            let nodes = store.collect(&Query::all()).unwrap();
            for n in &nodes {
                prop_assert_eq!(n.version as usize, n.change_history.len());
                match n.parent_id() {
                    None => prop_assert_eq!(n.node_type(), NodeType::Portfolio),
                    Some(parent_id) => {
                        let parent = store.get(parent_id).unwrap();
                        prop_assert!(parent.is_some());
                        let parent = parent.unwrap();
                        prop_assert_eq!(Some(parent.node_type()), n.node_type().expected_parent());
                    }
                }
            }
            for check in ConsistencyCheck::ALL {
                prop_assert!(service.run_consistency_check(check, CheckScope::All).unwrap().is_clean());
            }
        }
    }
}
