//! Committed-store collaborators and the merged transaction view over them.
//!
//! The kernel never writes to the committed store. It reads it through
//! [`StoreReader`], reserves identifiers through [`IdAllocator`], and layers
//! the transaction overlay on top with [`StoreView`].

#![forbid(unsafe_code)]

mod memory;
mod view;

use smallvec::SmallVec;

use crate::index::IndexDescriptor;
use crate::txstate::IndexEntry;
use crate::types::{LabelId, NodeId, PropId, PropValue, RelId, Result, TypeId};

pub use memory::MemoryStore;
pub use view::StoreView;

pub(crate) use view::{node_exists, node_labels, node_properties};

/// Committed node as seen by a store reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRecord {
    /// Node identifier.
    pub id: NodeId,
    /// Labels, sorted ascending and unique.
    pub labels: SmallVec<[LabelId; 4]>,
}

impl NodeRecord {
    /// Whether the record carries `label`.
    pub fn has_label(&self, label: LabelId) -> bool {
        self.labels.binary_search(&label).is_ok()
    }
}

/// Committed relationship as seen by a store reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationshipRecord {
    /// Relationship identifier.
    pub id: RelId,
    /// Relationship type.
    pub ty: TypeId,
    /// Source node.
    pub src: NodeId,
    /// Destination node.
    pub dst: NodeId,
}

/// Direction of relationships relative to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    /// Relationships starting at the node.
    Out,
    /// Relationships ending at the node.
    In,
    /// Both directions; self loops are reported once.
    Both,
}

/// Per-type relationship counts around a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationshipGroup {
    /// Relationship type of this group.
    pub ty: TypeId,
    /// Relationships leaving the node.
    pub outgoing: usize,
    /// Relationships entering the node.
    pub incoming: usize,
    /// Relationships that start and end at the node.
    pub loops: usize,
}

/// Read access to committed data.
///
/// Every call is an independent, short-lived read; implementations must not
/// hand out state that outlives the call. Identifier lists are returned
/// sorted ascending.
pub trait StoreReader: Send + Sync {
    /// Loads the committed node, if present.
    fn node(&self, id: NodeId) -> Result<Option<NodeRecord>>;

    /// Committed properties of a node, sorted by key. Empty for unknown nodes.
    fn node_properties(&self, id: NodeId) -> Result<Vec<(PropId, PropValue)>>;

    /// All committed node ids.
    fn all_nodes(&self) -> Result<Vec<NodeId>>;

    /// Committed nodes carrying `label`.
    fn nodes_with_label(&self, label: LabelId) -> Result<Vec<NodeId>>;

    /// Loads the committed relationship, if present.
    fn relationship(&self, id: RelId) -> Result<Option<RelationshipRecord>>;

    /// Committed properties of a relationship, sorted by key.
    fn relationship_properties(&self, id: RelId) -> Result<Vec<(PropId, PropValue)>>;

    /// All committed relationship ids.
    fn all_relationships(&self) -> Result<Vec<RelId>>;

    /// Committed relationships of type `ty`.
    fn relationships_of_type(&self, ty: TypeId) -> Result<Vec<RelId>>;

    /// Committed relationships attached to `node` in direction `dir`, sorted by id.
    fn node_relationships(&self, node: NodeId, dir: Dir) -> Result<Vec<RelationshipRecord>>;

    /// Committed graph-level properties, sorted by key.
    fn graph_properties(&self) -> Result<Vec<(PropId, PropValue)>>;

    /// Committed entries of a property index.
    fn index_entries(&self, index: &IndexDescriptor) -> Result<Vec<IndexEntry>>;
}

/// Source of fresh node identifiers.
pub trait IdAllocator: Send + Sync {
    /// Reserves an id that no committed or in-flight node uses.
    fn reserve_node(&self) -> NodeId;
}
