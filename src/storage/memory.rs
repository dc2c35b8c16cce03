use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::debug;

use crate::index::IndexDescriptor;
use crate::txstate::IndexEntry;
use crate::types::{LabelId, NodeId, PropId, PropValue, RelId, Result, TypeId};

use super::{Dir, IdAllocator, NodeRecord, RelationshipRecord, StoreReader};

#[derive(Debug, Default)]
struct StoredNode {
    labels: SmallVec<[LabelId; 4]>,
    props: BTreeMap<PropId, PropValue>,
}

#[derive(Debug)]
struct StoredRelationship {
    record: RelationshipRecord,
    props: BTreeMap<PropId, PropValue>,
}

#[derive(Debug, Default)]
struct Data {
    nodes: BTreeMap<NodeId, StoredNode>,
    relationships: BTreeMap<RelId, StoredRelationship>,
    graph_props: BTreeMap<PropId, PropValue>,
}

/// Committed graph held in memory.
///
/// Stands in for the record store behind the kernel: it answers
/// [`StoreReader`] queries and hands out node ids. The seeding methods
/// write committed data directly and model other, already committed
/// transactions.
#[derive(Debug)]
pub struct MemoryStore {
    data: RwLock<Data>,
    next_node: AtomicU64,
    next_rel: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store. Identifiers start at zero.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Data::default()),
            next_node: AtomicU64::new(0),
            next_rel: AtomicU64::new(0),
        }
    }

    /// Commits a node with `labels` and `props` and returns its id.
    pub fn create_node(&self, labels: &[LabelId], props: &[(PropId, PropValue)]) -> NodeId {
        let id = self.reserve_node();
        let mut labels = SmallVec::from_slice(labels);
        labels.sort_unstable();
        labels.dedup();
        let node = StoredNode {
            labels,
            props: props.iter().cloned().collect(),
        };
        self.data.write().nodes.insert(id, node);
        debug!(node = id.0, "memory store: node committed");
        id
    }

    /// Commits a relationship from `src` to `dst` and returns its id.
    pub fn create_relationship(
        &self,
        src: NodeId,
        ty: TypeId,
        dst: NodeId,
        props: &[(PropId, PropValue)],
    ) -> RelId {
        let id = RelId(self.next_rel.fetch_add(1, Ordering::Relaxed));
        let rel = StoredRelationship {
            record: RelationshipRecord { id, ty, src, dst },
            props: props.iter().cloned().collect(),
        };
        self.data.write().relationships.insert(id, rel);
        id
    }

    /// Commits a graph-level property.
    pub fn set_graph_property(&self, key: PropId, value: PropValue) {
        self.data.write().graph_props.insert(key, value);
    }

    /// Removes a committed node and its relationships, as a concurrent
    /// committer would. Returns whether the node existed.
    pub fn delete_node(&self, id: NodeId) -> bool {
        let mut data = self.data.write();
        if data.nodes.remove(&id).is_none() {
            return false;
        }
        data.relationships
            .retain(|_, rel| rel.record.src != id && rel.record.dst != id);
        debug!(node = id.0, "memory store: node removed");
        true
    }

    /// Number of committed nodes.
    pub fn node_count(&self) -> usize {
        self.data.read().nodes.len()
    }
}

impl StoreReader for MemoryStore {
    fn node(&self, id: NodeId) -> Result<Option<NodeRecord>> {
        Ok(self.data.read().nodes.get(&id).map(|node| NodeRecord {
            id,
            labels: node.labels.clone(),
        }))
    }

    fn node_properties(&self, id: NodeId) -> Result<Vec<(PropId, PropValue)>> {
        Ok(self
            .data
            .read()
            .nodes
            .get(&id)
            .map(|node| {
                node.props
                    .iter()
                    .map(|(k, v)| (*k, v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn all_nodes(&self) -> Result<Vec<NodeId>> {
        Ok(self.data.read().nodes.keys().copied().collect())
    }

    fn nodes_with_label(&self, label: LabelId) -> Result<Vec<NodeId>> {
        Ok(self
            .data
            .read()
            .nodes
            .iter()
            .filter(|(_, node)| node.labels.binary_search(&label).is_ok())
            .map(|(id, _)| *id)
            .collect())
    }

    fn relationship(&self, id: RelId) -> Result<Option<RelationshipRecord>> {
        Ok(self.data.read().relationships.get(&id).map(|rel| rel.record))
    }

    fn relationship_properties(&self, id: RelId) -> Result<Vec<(PropId, PropValue)>> {
        Ok(self
            .data
            .read()
            .relationships
            .get(&id)
            .map(|rel| rel.props.iter().map(|(k, v)| (*k, v.clone())).collect())
            .unwrap_or_default())
    }

    fn all_relationships(&self) -> Result<Vec<RelId>> {
        Ok(self.data.read().relationships.keys().copied().collect())
    }

    fn relationships_of_type(&self, ty: TypeId) -> Result<Vec<RelId>> {
        Ok(self
            .data
            .read()
            .relationships
            .values()
            .filter(|rel| rel.record.ty == ty)
            .map(|rel| rel.record.id)
            .collect())
    }

    fn node_relationships(&self, node: NodeId, dir: Dir) -> Result<Vec<RelationshipRecord>> {
        Ok(self
            .data
            .read()
            .relationships
            .values()
            .map(|rel| rel.record)
            .filter(|record| match dir {
                Dir::Out => record.src == node,
                Dir::In => record.dst == node,
                Dir::Both => record.src == node || record.dst == node,
            })
            .collect())
    }

    fn graph_properties(&self) -> Result<Vec<(PropId, PropValue)>> {
        Ok(self
            .data
            .read()
            .graph_props
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }

    fn index_entries(&self, index: &IndexDescriptor) -> Result<Vec<IndexEntry>> {
        let data = self.data.read();
        let mut entries = Vec::new();
        for (id, node) in &data.nodes {
            if node.labels.binary_search(&index.label).is_err() {
                continue;
            }
            let values: Option<SmallVec<[PropValue; 2]>> = index
                .properties
                .iter()
                .map(|prop| node.props.get(prop).cloned())
                .collect();
            if let Some(values) = values {
                entries.push(IndexEntry { values, node: *id });
            }
        }
        entries.sort();
        Ok(entries)
    }
}

impl IdAllocator for MemoryStore {
    fn reserve_node(&self) -> NodeId {
        NodeId(self.next_node.fetch_add(1, Ordering::Relaxed))
    }
}
