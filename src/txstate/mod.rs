//! Transaction-local overlay of pending mutations.
//!
//! Nothing in here performs I/O or is visible to other transactions; the
//! overlay is dropped when the owning transaction closes, whatever the
//! outcome.

#![forbid(unsafe_code)]

mod diff;
mod explicit;
mod index;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::types::{LabelId, NodeId};

pub use diff::DiffSets;
pub use explicit::ExplicitIndexTxState;
pub use index::{IndexEntry, IndexTxState};

/// Node creations, deletions and label deltas recorded by one transaction.
#[derive(Debug, Default)]
pub struct TxState {
    created: FxHashSet<NodeId>,
    deleted: FxHashSet<NodeId>,
    labels: FxHashMap<NodeId, DiffSets<LabelId>>,
}

impl TxState {
    /// Creates an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the node was created by this transaction and not deleted since.
    pub fn node_is_added_in_this_tx(&self, node: NodeId) -> bool {
        self.created.contains(&node)
    }

    /// Whether the node existed before this transaction and was deleted by it.
    pub fn node_is_deleted_in_this_tx(&self, node: NodeId) -> bool {
        self.deleted.contains(&node)
    }

    /// Label changes recorded for `node`; `None` when there are none.
    pub fn node_label_diff(&self, node: NodeId) -> Option<&DiffSets<LabelId>> {
        self.labels.get(&node)
    }

    /// Records a freshly reserved node.
    pub fn node_do_create(&mut self, node: NodeId) {
        trace!(node = node.0, "txstate: create");
        self.created.insert(node);
    }

    /// Records a node deletion and drops its label changes.
    ///
    /// Deleting a node created in this transaction leaves no trace at all.
    pub fn node_do_delete(&mut self, node: NodeId) {
        trace!(node = node.0, "txstate: delete");
        self.labels.remove(&node);
        if !self.created.remove(&node) {
            self.deleted.insert(node);
        }
    }

    /// Records `label` as added to `node`.
    pub fn node_do_add_label(&mut self, label: LabelId, node: NodeId) {
        trace!(node = node.0, label = label.0, "txstate: add label");
        self.labels.entry(node).or_default().add(label);
        self.prune_labels(node);
    }

    /// Records `label` as removed from `node`.
    pub fn node_do_remove_label(&mut self, label: LabelId, node: NodeId) {
        trace!(node = node.0, label = label.0, "txstate: remove label");
        self.labels.entry(node).or_default().remove(label);
        self.prune_labels(node);
    }

    fn prune_labels(&mut self, node: NodeId) {
        if self.labels.get(&node).is_some_and(DiffSets::is_empty) {
            self.labels.remove(&node);
        }
    }

    /// Nodes created in this transaction, in no particular order.
    pub fn added_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.created.iter().copied()
    }

    /// Nodes deleted in this transaction, in no particular order.
    pub fn deleted_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.deleted.iter().copied()
    }

    /// Nodes that carry label changes, with their diffs.
    pub fn label_changes(&self) -> impl Iterator<Item = (NodeId, &DiffSets<LabelId>)> + '_ {
        self.labels.iter().map(|(node, diff)| (*node, diff))
    }

    /// Whether the overlay records any change.
    pub fn has_changes(&self) -> bool {
        !(self.created.is_empty() && self.deleted.is_empty() && self.labels.is_empty())
    }

    /// Discards every recorded change.
    pub fn clear(&mut self) {
        self.created.clear();
        self.deleted.clear();
        self.labels.clear();
    }
}
