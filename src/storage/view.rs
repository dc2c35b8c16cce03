//! Read-your-own-writes view: committed data with the transaction overlay applied.
//!
//! Each query type has exactly one merge function taking the overlay and the
//! committed reader. [`StoreView`] only bundles the borrowed state and
//! forwards to them, so the merge rules live in one place.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::index::{ExplicitIndexStore, IndexDescriptor, IndexOrder, IndexQuery};
use crate::txstate::{ExplicitIndexTxState, IndexEntry, IndexTxState, TxState};
use crate::types::{KernelError, LabelId, NodeId, PropId, PropValue, RelId, Result, TypeId};

use super::{Dir, NodeRecord, RelationshipGroup, RelationshipRecord, StoreReader};

/// Whether `node` exists from the transaction's point of view.
pub(crate) fn node_exists(tx: &TxState, store: &dyn StoreReader, node: NodeId) -> Result<bool> {
    if tx.node_is_deleted_in_this_tx(node) {
        return Ok(false);
    }
    if tx.node_is_added_in_this_tx(node) {
        return Ok(true);
    }
    Ok(store.node(node)?.is_some())
}

/// Labels of `node` with the transaction's label changes applied, or `None`
/// when the node does not exist for this transaction.
pub(crate) fn node_labels(
    tx: &TxState,
    store: &dyn StoreReader,
    node: NodeId,
) -> Result<Option<SmallVec<[LabelId; 4]>>> {
    if tx.node_is_deleted_in_this_tx(node) {
        return Ok(None);
    }
    let mut labels: SmallVec<[LabelId; 4]> = if tx.node_is_added_in_this_tx(node) {
        SmallVec::new()
    } else {
        match store.node(node)? {
            Some(record) => record.labels,
            None => return Ok(None),
        }
    };
    if let Some(diff) = tx.node_label_diff(node) {
        labels.retain(|label| !diff.is_removed(label));
        labels.extend(diff.added().iter().copied());
        labels.sort_unstable();
        labels.dedup();
    }
    Ok(Some(labels))
}

/// Properties of `node` visible to the transaction.
///
/// Property writes are not part of the overlay, so created nodes have none
/// and deleted nodes are hidden entirely.
pub(crate) fn node_properties(
    tx: &TxState,
    store: &dyn StoreReader,
    node: NodeId,
) -> Result<Vec<(PropId, PropValue)>> {
    if tx.node_is_deleted_in_this_tx(node) || tx.node_is_added_in_this_tx(node) {
        return Ok(Vec::new());
    }
    store.node_properties(node)
}

fn all_nodes(tx: &TxState, store: &dyn StoreReader) -> Result<Vec<NodeId>> {
    let mut nodes = store.all_nodes()?;
    nodes.retain(|node| !tx.node_is_deleted_in_this_tx(*node));
    nodes.extend(tx.added_nodes());
    nodes.sort_unstable();
    nodes.dedup();
    Ok(nodes)
}

fn nodes_with_label(tx: &TxState, store: &dyn StoreReader, label: LabelId) -> Result<Vec<NodeId>> {
    let mut nodes = store.nodes_with_label(label)?;
    nodes.retain(|node| {
        !tx.node_is_deleted_in_this_tx(*node)
            && !tx
                .node_label_diff(*node)
                .is_some_and(|diff| diff.is_removed(&label))
    });
    nodes.extend(
        tx.label_changes()
            .filter(|(_, diff)| diff.is_added(&label))
            .map(|(node, _)| node),
    );
    nodes.sort_unstable();
    nodes.dedup();
    Ok(nodes)
}

fn relationship_visible(tx: &TxState, record: &RelationshipRecord) -> bool {
    !tx.node_is_deleted_in_this_tx(record.src) && !tx.node_is_deleted_in_this_tx(record.dst)
}

fn relationship(
    tx: &TxState,
    store: &dyn StoreReader,
    id: RelId,
) -> Result<Option<RelationshipRecord>> {
    Ok(store
        .relationship(id)?
        .filter(|record| relationship_visible(tx, record)))
}

fn index_seek(
    tx: &TxState,
    index_tx: &IndexTxState,
    store: &dyn StoreReader,
    index: &IndexDescriptor,
    order: IndexOrder,
    queries: &[IndexQuery],
) -> Result<Vec<IndexEntry>> {
    if queries.len() != index.properties.len()
        || queries
            .iter()
            .zip(index.properties.iter())
            .any(|(query, prop)| query.prop() != *prop)
    {
        return Err(KernelError::Invalid(
            "index query does not match the index properties",
        ));
    }
    let matches = |entry: &IndexEntry| {
        queries
            .iter()
            .zip(entry.values.iter())
            .all(|(query, value)| query.matches(value))
    };
    let diff = index_tx.diff(index);
    let mut entries: Vec<IndexEntry> = store
        .index_entries(index)?
        .into_iter()
        .filter(|entry| {
            !tx.node_is_deleted_in_this_tx(entry.node)
                && !diff.is_some_and(|diff| diff.is_removed(entry))
                && matches(entry)
        })
        .collect();
    if let Some(diff) = diff {
        entries.extend(diff.added().iter().filter(|entry| matches(*entry)).cloned());
    }
    entries.sort();
    entries.dedup();
    if order == IndexOrder::Descending {
        entries.reverse();
    }
    Ok(entries)
}

/// Merged read façade over the committed store and one transaction's overlay.
pub struct StoreView<'a> {
    tx: &'a TxState,
    index_tx: &'a IndexTxState,
    explicit_tx: &'a ExplicitIndexTxState,
    store: &'a dyn StoreReader,
    explicit: &'a dyn ExplicitIndexStore,
}

impl<'a> StoreView<'a> {
    /// Creates a view over the given overlay and collaborators.
    pub fn new(
        tx: &'a TxState,
        index_tx: &'a IndexTxState,
        explicit_tx: &'a ExplicitIndexTxState,
        store: &'a dyn StoreReader,
        explicit: &'a dyn ExplicitIndexStore,
    ) -> Self {
        Self {
            tx,
            index_tx,
            explicit_tx,
            store,
            explicit,
        }
    }

    /// Whether `node` exists for this transaction.
    pub fn node_exists(&self, node: NodeId) -> Result<bool> {
        node_exists(self.tx, self.store, node)
    }

    /// Labels of `node`, or `None` when it does not exist for this transaction.
    pub fn node_labels(&self, node: NodeId) -> Result<Option<SmallVec<[LabelId; 4]>>> {
        node_labels(self.tx, self.store, node)
    }

    /// The node with its merged labels.
    pub fn single_node(&self, node: NodeId) -> Result<Option<NodeRecord>> {
        Ok(self
            .node_labels(node)?
            .map(|labels| NodeRecord { id: node, labels }))
    }

    /// Every node visible to the transaction, ascending.
    pub fn all_nodes_scan(&self) -> Result<Vec<NodeId>> {
        all_nodes(self.tx, self.store)
    }

    /// Nodes carrying `label`, ascending.
    pub fn node_label_scan(&self, label: LabelId) -> Result<Vec<NodeId>> {
        nodes_with_label(self.tx, self.store, label)
    }

    /// Nodes carrying at least one of `labels`, ascending.
    pub fn node_label_union_scan(&self, labels: &[LabelId]) -> Result<Vec<NodeId>> {
        let mut nodes = Vec::new();
        for label in labels {
            nodes.extend(self.node_label_scan(*label)?);
        }
        nodes.sort_unstable();
        nodes.dedup();
        Ok(nodes)
    }

    /// Nodes carrying every one of `labels`, ascending. Empty for no labels.
    pub fn node_label_intersection_scan(&self, labels: &[LabelId]) -> Result<Vec<NodeId>> {
        let Some((first, rest)) = labels.split_first() else {
            return Ok(Vec::new());
        };
        let mut nodes = self.node_label_scan(*first)?;
        for label in rest {
            if nodes.is_empty() {
                break;
            }
            let other = self.node_label_scan(*label)?;
            nodes.retain(|node| other.binary_search(node).is_ok());
        }
        Ok(nodes)
    }

    /// Properties of `node` visible to the transaction.
    pub fn node_properties(&self, node: NodeId) -> Result<Vec<(PropId, PropValue)>> {
        node_properties(self.tx, self.store, node)
    }

    /// The relationship, unless it is missing or attached to a node deleted
    /// in this transaction.
    pub fn single_relationship(&self, id: RelId) -> Result<Option<RelationshipRecord>> {
        relationship(self.tx, self.store, id)
    }

    /// Every visible relationship, ascending.
    pub fn all_relationships_scan(&self) -> Result<Vec<RelId>> {
        self.filter_relationships(self.store.all_relationships()?)
    }

    /// Visible relationships of type `ty`, ascending.
    pub fn relationship_type_scan(&self, ty: TypeId) -> Result<Vec<RelId>> {
        self.filter_relationships(self.store.relationships_of_type(ty)?)
    }

    fn filter_relationships(&self, ids: Vec<RelId>) -> Result<Vec<RelId>> {
        let mut visible = Vec::with_capacity(ids.len());
        for id in ids {
            if self.single_relationship(id)?.is_some() {
                visible.push(id);
            }
        }
        Ok(visible)
    }

    /// Relationships attached to `node` in direction `dir`.
    pub fn relationships(&self, node: NodeId, dir: Dir) -> Result<Vec<RelationshipRecord>> {
        if !self.node_exists(node)? || self.tx.node_is_added_in_this_tx(node) {
            return Ok(Vec::new());
        }
        let mut records = self.store.node_relationships(node, dir)?;
        records.retain(|record| relationship_visible(self.tx, record));
        Ok(records)
    }

    /// Relationship counts around `node`, grouped by type and ordered by type.
    pub fn relationship_groups(&self, node: NodeId) -> Result<Vec<RelationshipGroup>> {
        let mut groups: BTreeMap<TypeId, RelationshipGroup> = BTreeMap::new();
        for record in self.relationships(node, Dir::Both)? {
            let group = groups.entry(record.ty).or_insert(RelationshipGroup {
                ty: record.ty,
                outgoing: 0,
                incoming: 0,
                loops: 0,
            });
            if record.src == node && record.dst == node {
                group.loops += 1;
            } else if record.src == node {
                group.outgoing += 1;
            } else {
                group.incoming += 1;
            }
        }
        Ok(groups.into_values().collect())
    }

    /// Properties of a visible relationship; empty when it is not visible.
    pub fn relationship_properties(&self, id: RelId) -> Result<Vec<(PropId, PropValue)>> {
        if self.single_relationship(id)?.is_none() {
            return Ok(Vec::new());
        }
        self.store.relationship_properties(id)
    }

    /// Graph-level properties.
    pub fn graph_properties(&self) -> Result<Vec<(PropId, PropValue)>> {
        self.store.graph_properties()
    }

    /// Entries of `index` matching every query, one query per indexed property.
    pub fn node_index_seek(
        &self,
        index: &IndexDescriptor,
        order: IndexOrder,
        queries: &[IndexQuery],
    ) -> Result<Vec<IndexEntry>> {
        index_seek(self.tx, self.index_tx, self.store, index, order, queries)
    }

    /// Every entry of `index`.
    pub fn node_index_scan(
        &self,
        index: &IndexDescriptor,
        order: IndexOrder,
    ) -> Result<Vec<IndexEntry>> {
        let queries: Vec<IndexQuery> = index
            .properties
            .iter()
            .map(|prop| IndexQuery::Exists(*prop))
            .collect();
        index_seek(self.tx, self.index_tx, self.store, index, order, &queries)
    }

    fn visible_index_nodes(&self, index: &str, nodes: Vec<u64>) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = nodes
            .into_iter()
            .filter(|node| !self.explicit_tx.is_node_removed(index, *node))
            .map(NodeId)
            .filter(|node| !self.tx.node_is_deleted_in_this_tx(*node))
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Nodes stored under `key = value` in the explicit node index `index`.
    pub fn node_explicit_index_lookup(
        &self,
        index: &str,
        key: &str,
        value: &PropValue,
    ) -> Result<Vec<NodeId>> {
        let nodes = self.explicit.node_get(index, key, value)?;
        Ok(self.visible_index_nodes(index, nodes))
    }

    /// Nodes matching `query` in the explicit node index, optionally scoped to `key`.
    pub fn node_explicit_index_query(
        &self,
        index: &str,
        key: Option<&str>,
        query: &str,
    ) -> Result<Vec<NodeId>> {
        let nodes = self.explicit.node_query(index, key, query)?;
        Ok(self.visible_index_nodes(index, nodes))
    }

    fn visible_index_relationships(
        &self,
        ids: Vec<u64>,
        source: Option<NodeId>,
        target: Option<NodeId>,
    ) -> Result<Vec<RelId>> {
        let mut visible = Vec::new();
        for id in ids {
            let Some(record) = self.single_relationship(RelId(id))? else {
                continue;
            };
            if source.is_some_and(|src| src != record.src)
                || target.is_some_and(|dst| dst != record.dst)
            {
                continue;
            }
            visible.push(record.id);
        }
        visible.sort_unstable();
        visible.dedup();
        Ok(visible)
    }

    /// Relationships stored under `key = value`, optionally constrained by endpoints.
    pub fn relationship_explicit_index_get(
        &self,
        index: &str,
        key: &str,
        value: &PropValue,
        source: Option<NodeId>,
        target: Option<NodeId>,
    ) -> Result<Vec<RelId>> {
        let ids = self.explicit.relationship_get(index, key, value)?;
        self.visible_index_relationships(ids, source, target)
    }

    /// Relationships matching `query`, optionally scoped to `key` and endpoints.
    pub fn relationship_explicit_index_query(
        &self,
        index: &str,
        key: Option<&str>,
        query: &str,
        source: Option<NodeId>,
        target: Option<NodeId>,
    ) -> Result<Vec<RelId>> {
        let ids = self.explicit.relationship_query(index, key, query)?;
        self.visible_index_relationships(ids, source, target)
    }
}
