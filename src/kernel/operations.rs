//! Read and write operations bound to one transaction.
//!
//! Every public method starts with the liveness check and fails without side
//! effects when the transaction is closed or terminated. Writes resolve state
//! from the overlay first and fall back to the committed store only after
//! taking the node's exclusive lock.

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::index::{
    ExplicitIndexConfig, IndexDescriptor, IndexOrder, IndexQuery, IndexTxStateUpdater, LabelChange,
};
use crate::locking::ResourceType;
use crate::storage::{self, Dir, NodeRecord, RelationshipGroup, RelationshipRecord, StoreView};
use crate::txstate::IndexEntry;
use crate::types::{
    EntityType, KernelError, LabelId, NodeId, PropId, PropValue, RelId, Result, TypeId,
};

use super::KernelTransaction;

/// Operation surface of a [`KernelTransaction`].
///
/// Obtained from [`KernelTransaction::operations`]; it borrows the
/// transaction mutably and so cannot outlive it.
pub struct Operations<'a> {
    tx: &'a mut KernelTransaction,
}

impl<'a> Operations<'a> {
    pub(crate) fn new(tx: &'a mut KernelTransaction) -> Self {
        Self { tx }
    }

    fn assert_live(&self) -> Result<()> {
        if !self.tx.open {
            self.tx.services.metrics.liveness_rejected();
            return Err(KernelError::NotInTransaction);
        }
        if let Some(reason) = self.tx.termination.reason() {
            self.tx.services.metrics.liveness_rejected();
            return Err(KernelError::TransactionTerminated(reason));
        }
        Ok(())
    }

    fn view(&self) -> StoreView<'_> {
        let tx = &*self.tx;
        StoreView::new(
            &tx.tx_state,
            &tx.index_tx_state,
            &tx.explicit_tx_state,
            tx.services.store.as_ref(),
            tx.services.explicit_indexes.as_ref(),
        )
    }

    fn lock_node(&mut self, node: NodeId) -> Result<()> {
        self.tx.locks.acquire_exclusive(ResourceType::Node, node.0)?;
        self.tx.services.metrics.lock_acquired();
        Ok(())
    }

    fn fire_index_trigger(&mut self, label: LabelId, node: NodeId, change: LabelChange) -> Result<()> {
        let tx = &mut *self.tx;
        let services = &*tx.services;
        let recorded = IndexTxStateUpdater::new(services.schema.as_ref()).on_label_change(
            label,
            node,
            change,
            &tx.tx_state,
            services.store.as_ref(),
            &mut tx.index_tx_state,
        )?;
        if recorded > 0 {
            services.metrics.index_entries_recorded(recorded);
        }
        Ok(())
    }

    // WRITE

    /// Creates a node visible only to this transaction and returns its id.
    pub fn node_create(&mut self) -> Result<NodeId> {
        self.assert_live()?;
        let node = self.tx.services.ids.reserve_node();
        self.tx.tx_state.node_do_create(node);
        self.tx.services.metrics.node_created();
        debug!(tx = self.tx.id, node = node.0, "node created");
        Ok(node)
    }

    /// Deletes a node.
    ///
    /// Returns `false` when the node is already deleted in this transaction
    /// or does not exist at all. Nodes created by this transaction are
    /// deleted without taking a lock; any other node is locked first and its
    /// existence re-checked under the lock.
    pub fn node_delete(&mut self, node: NodeId) -> Result<bool> {
        self.assert_live()?;
        if self.tx.tx_state.node_is_added_in_this_tx(node) {
            self.remove_node(node)?;
            return Ok(true);
        }
        if self.tx.tx_state.node_is_deleted_in_this_tx(node) {
            trace!(tx = self.tx.id, node = node.0, "node already deleted");
            return Ok(false);
        }
        self.lock_node(node)?;
        if !storage::node_exists(&self.tx.tx_state, self.tx.services.store.as_ref(), node)? {
            debug!(tx = self.tx.id, node = node.0, "delete of missing node");
            return Ok(false);
        }
        self.remove_node(node)?;
        Ok(true)
    }

    /// Notifies auto indexing, withdraws the node from every index its labels
    /// put it in, then records the deletion.
    fn remove_node(&mut self, node: NodeId) -> Result<()> {
        let labels =
            storage::node_labels(&self.tx.tx_state, self.tx.services.store.as_ref(), node)?
                .unwrap_or_default();
        {
            let tx = &mut *self.tx;
            tx.services
                .auto_indexing
                .entity_removed(&mut tx.explicit_tx_state, EntityType::Node, node.0)?;
        }
        for label in labels {
            self.fire_index_trigger(label, node, LabelChange::Removed)?;
        }
        self.tx.tx_state.node_do_delete(node);
        self.tx.services.metrics.node_deleted();
        debug!(tx = self.tx.id, node = node.0, "node deleted");
        Ok(())
    }

    /// Adds `label` to `node`. Returns `false` when the node already has it
    /// or was deleted in this transaction.
    pub fn node_add_label(&mut self, node: NodeId, label: LabelId) -> Result<bool> {
        self.apply_label_change(node, label, LabelChange::Added)
    }

    /// Removes `label` from `node`. Returns `false` when the node lacks it
    /// or was deleted in this transaction.
    pub fn node_remove_label(&mut self, node: NodeId, label: LabelId) -> Result<bool> {
        self.apply_label_change(node, label, LabelChange::Removed)
    }

    fn apply_label_change(&mut self, node: NodeId, label: LabelId, change: LabelChange) -> Result<bool> {
        self.assert_live()?;
        let tx_state = &self.tx.tx_state;
        if tx_state.node_is_added_in_this_tx(node) {
            let has_label = tx_state
                .node_label_diff(node)
                .is_some_and(|diff| diff.is_added(&label));
            if change.is_satisfied_by(has_label) {
                return Ok(false);
            }
            self.record_label_change(node, label, change)?;
            return Ok(true);
        }
        if tx_state.node_is_deleted_in_this_tx(node) {
            trace!(tx = self.tx.id, node = node.0, "label write on deleted node ignored");
            return Ok(false);
        }

        self.lock_node(node)?;
        let labels = storage::node_labels(&self.tx.tx_state, self.tx.services.store.as_ref(), node)?
            .ok_or(KernelError::EntityNotFound {
                entity: EntityType::Node,
                id: node.0,
            })?;
        if change.is_satisfied_by(labels.contains(&label)) {
            return Ok(false);
        }
        self.record_label_change(node, label, change)?;
        Ok(true)
    }

    fn record_label_change(&mut self, node: NodeId, label: LabelId, change: LabelChange) -> Result<()> {
        match change {
            LabelChange::Added => {
                self.tx.tx_state.node_do_add_label(label, node);
                self.tx.services.metrics.label_added();
            }
            LabelChange::Removed => {
                self.tx.tx_state.node_do_remove_label(label, node);
                self.tx.services.metrics.label_removed();
            }
        }
        debug!(tx = self.tx.id, node = node.0, label = label.0, ?change, "label changed");
        self.fire_index_trigger(label, node, change)
    }

    /// Not available on this write path.
    pub fn relationship_create(&mut self, _src: NodeId, _ty: TypeId, _dst: NodeId) -> Result<RelId> {
        self.assert_live()?;
        Err(KernelError::Unsupported("relationship_create"))
    }

    /// Not available on this write path.
    pub fn relationship_delete(&mut self, _rel: RelId) -> Result<bool> {
        self.assert_live()?;
        Err(KernelError::Unsupported("relationship_delete"))
    }

    /// Not available on this write path.
    pub fn node_set_property(
        &mut self,
        _node: NodeId,
        _key: PropId,
        _value: PropValue,
    ) -> Result<Option<PropValue>> {
        self.assert_live()?;
        Err(KernelError::Unsupported("node_set_property"))
    }

    /// Not available on this write path.
    pub fn node_remove_property(&mut self, _node: NodeId, _key: PropId) -> Result<Option<PropValue>> {
        self.assert_live()?;
        Err(KernelError::Unsupported("node_remove_property"))
    }

    /// Not available on this write path.
    pub fn relationship_set_property(
        &mut self,
        _rel: RelId,
        _key: PropId,
        _value: PropValue,
    ) -> Result<Option<PropValue>> {
        self.assert_live()?;
        Err(KernelError::Unsupported("relationship_set_property"))
    }

    /// Not available on this write path.
    pub fn relationship_remove_property(
        &mut self,
        _rel: RelId,
        _key: PropId,
    ) -> Result<Option<PropValue>> {
        self.assert_live()?;
        Err(KernelError::Unsupported("relationship_remove_property"))
    }

    /// Not available on this write path.
    pub fn graph_set_property(&mut self, _key: PropId, _value: PropValue) -> Result<Option<PropValue>> {
        self.assert_live()?;
        Err(KernelError::Unsupported("graph_set_property"))
    }

    /// Not available on this write path.
    pub fn graph_remove_property(&mut self, _key: PropId) -> Result<Option<PropValue>> {
        self.assert_live()?;
        Err(KernelError::Unsupported("graph_remove_property"))
    }

    /// Hides `node` from the explicit node index `index` for the rest of
    /// the transaction.
    pub fn node_remove_from_explicit_index(&mut self, index: &str, node: NodeId) -> Result<()> {
        self.assert_live()?;
        if !self.tx.services.explicit_indexes.node_index_exists(index)? {
            return Err(KernelError::ExplicitIndexNotFound(index.to_owned()));
        }
        self.tx.explicit_tx_state.remove_node(index, node.0);
        trace!(tx = self.tx.id, node = node.0, index, "explicit index removal");
        Ok(())
    }

    /// Creates the explicit node index `index` unless it exists and returns
    /// its effective configuration. `custom` overrides the configured defaults.
    pub fn node_explicit_index_create_lazily(
        &mut self,
        index: &str,
        custom: Option<&ExplicitIndexConfig>,
    ) -> Result<ExplicitIndexConfig> {
        self.assert_live()?;
        let services = &self.tx.services;
        let mut config = services.config.explicit_index.default_config.clone();
        if let Some(custom) = custom {
            config.extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        services
            .explicit_indexes
            .create_node_index_if_absent(index, &config)
    }

    // READ

    /// Whether `node` exists for this transaction.
    pub fn node_exists(&self, node: NodeId) -> Result<bool> {
        self.assert_live()?;
        self.view().node_exists(node)
    }

    /// Labels of `node`, or `None` when it does not exist.
    pub fn node_labels(&self, node: NodeId) -> Result<Option<SmallVec<[LabelId; 4]>>> {
        self.assert_live()?;
        self.view().node_labels(node)
    }

    /// The node with its labels.
    pub fn single_node(&self, node: NodeId) -> Result<Option<NodeRecord>> {
        self.assert_live()?;
        self.view().single_node(node)
    }

    /// Every node visible to this transaction.
    pub fn all_nodes_scan(&self) -> Result<Vec<NodeId>> {
        self.assert_live()?;
        self.view().all_nodes_scan()
    }

    /// Nodes carrying `label`.
    pub fn node_label_scan(&self, label: LabelId) -> Result<Vec<NodeId>> {
        self.assert_live()?;
        self.view().node_label_scan(label)
    }

    /// Nodes carrying any of `labels`.
    pub fn node_label_union_scan(&self, labels: &[LabelId]) -> Result<Vec<NodeId>> {
        self.assert_live()?;
        self.view().node_label_union_scan(labels)
    }

    /// Nodes carrying all of `labels`.
    pub fn node_label_intersection_scan(&self, labels: &[LabelId]) -> Result<Vec<NodeId>> {
        self.assert_live()?;
        self.view().node_label_intersection_scan(labels)
    }

    /// Properties of `node`.
    pub fn node_properties(&self, node: NodeId) -> Result<Vec<(PropId, PropValue)>> {
        self.assert_live()?;
        self.view().node_properties(node)
    }

    /// The relationship, if visible.
    pub fn single_relationship(&self, rel: RelId) -> Result<Option<RelationshipRecord>> {
        self.assert_live()?;
        self.view().single_relationship(rel)
    }

    /// Every visible relationship.
    pub fn all_relationships_scan(&self) -> Result<Vec<RelId>> {
        self.assert_live()?;
        self.view().all_relationships_scan()
    }

    /// Visible relationships of type `ty`.
    pub fn relationship_type_scan(&self, ty: TypeId) -> Result<Vec<RelId>> {
        self.assert_live()?;
        self.view().relationship_type_scan(ty)
    }

    /// Relationship counts around `node` per type.
    pub fn relationship_groups(&self, node: NodeId) -> Result<Vec<RelationshipGroup>> {
        self.assert_live()?;
        self.view().relationship_groups(node)
    }

    /// Relationships of `node` in direction `dir`.
    pub fn relationships(&self, node: NodeId, dir: Dir) -> Result<Vec<RelationshipRecord>> {
        self.assert_live()?;
        self.view().relationships(node, dir)
    }

    /// Properties of a relationship.
    pub fn relationship_properties(&self, rel: RelId) -> Result<Vec<(PropId, PropValue)>> {
        self.assert_live()?;
        self.view().relationship_properties(rel)
    }

    /// Graph-level properties.
    pub fn graph_properties(&self) -> Result<Vec<(PropId, PropValue)>> {
        self.assert_live()?;
        self.view().graph_properties()
    }

    /// Fails with [`KernelError::EntityNotFound`] unless `node` resolves.
    pub fn future_node_reference_read(&self, node: NodeId) -> Result<()> {
        self.assert_live()?;
        self.require_node(node)
    }

    /// Fails with [`KernelError::EntityNotFound`] unless `rel` resolves.
    pub fn future_relationship_reference_read(&self, rel: RelId) -> Result<()> {
        self.assert_live()?;
        self.require_relationship(rel)
    }

    /// Fails with [`KernelError::EntityNotFound`] unless the properties of
    /// `node` can be read.
    pub fn future_node_property_reference_read(&self, node: NodeId) -> Result<()> {
        self.assert_live()?;
        self.require_node(node)
    }

    /// Fails with [`KernelError::EntityNotFound`] unless the properties of
    /// `rel` can be read.
    pub fn future_relationship_property_reference_read(&self, rel: RelId) -> Result<()> {
        self.assert_live()?;
        self.require_relationship(rel)
    }

    fn require_node(&self, node: NodeId) -> Result<()> {
        if self.view().node_exists(node)? {
            Ok(())
        } else {
            Err(KernelError::EntityNotFound {
                entity: EntityType::Node,
                id: node.0,
            })
        }
    }

    fn require_relationship(&self, rel: RelId) -> Result<()> {
        match self.view().single_relationship(rel)? {
            Some(_) => Ok(()),
            None => Err(KernelError::EntityNotFound {
                entity: EntityType::Relationship,
                id: rel.0,
            }),
        }
    }

    /// Entries of `index` matching `queries`, including this transaction's deltas.
    pub fn node_index_seek(
        &self,
        index: &IndexDescriptor,
        order: IndexOrder,
        queries: &[IndexQuery],
    ) -> Result<Vec<IndexEntry>> {
        self.assert_live()?;
        self.view().node_index_seek(index, order, queries)
    }

    /// Every entry of `index`, including this transaction's deltas.
    pub fn node_index_scan(&self, index: &IndexDescriptor, order: IndexOrder) -> Result<Vec<IndexEntry>> {
        self.assert_live()?;
        self.view().node_index_scan(index, order)
    }

    /// Nodes under `key = value` in the explicit index `index`.
    pub fn node_explicit_index_lookup(
        &self,
        index: &str,
        key: &str,
        value: &PropValue,
    ) -> Result<Vec<NodeId>> {
        self.assert_live()?;
        self.view().node_explicit_index_lookup(index, key, value)
    }

    /// Nodes matching `query` in the explicit index `index`.
    pub fn node_explicit_index_query(
        &self,
        index: &str,
        key: Option<&str>,
        query: &str,
    ) -> Result<Vec<NodeId>> {
        self.assert_live()?;
        self.view().node_explicit_index_query(index, key, query)
    }

    /// Relationships under `key = value`, optionally bound to endpoints.
    pub fn relationship_explicit_index_get(
        &self,
        index: &str,
        key: &str,
        value: &PropValue,
        source: Option<NodeId>,
        target: Option<NodeId>,
    ) -> Result<Vec<RelId>> {
        self.assert_live()?;
        self.view()
            .relationship_explicit_index_get(index, key, value, source, target)
    }

    /// Relationships matching `query`, optionally bound to endpoints.
    pub fn relationship_explicit_index_query(
        &self,
        index: &str,
        key: Option<&str>,
        query: &str,
        source: Option<NodeId>,
        target: Option<NodeId>,
    ) -> Result<Vec<RelId>> {
        self.assert_live()?;
        self.view()
            .relationship_explicit_index_query(index, key, query, source, target)
    }

    // SCHEMA READ

    /// The index on `label` over exactly `properties`, if defined.
    pub fn index(&self, label: LabelId, properties: &[PropId]) -> Result<Option<IndexDescriptor>> {
        self.assert_live()?;
        self.tx.services.schema.index(label, properties)
    }

    /// Every index defined on `label`.
    pub fn indexes_for_label(&self, label: LabelId) -> Result<Vec<IndexDescriptor>> {
        self.assert_live()?;
        self.tx.services.schema.indexes_for_label(label)
    }
}
