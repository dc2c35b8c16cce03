use tracing::{debug, trace};

use crate::storage::{self, StoreReader};
use crate::txstate::{IndexEntry, IndexTxState, TxState};
use crate::types::{LabelId, NodeId, PropId, PropValue, Result};

use super::{IndexDescriptor, LabelChange, SchemaRead};

/// Turns label changes into transaction-local index deltas.
///
/// Runs inline with the label write that triggered it. Entries are built
/// from the node's properties as the transaction currently sees them; a node
/// lacking one of an index's properties has no entry in that index.
pub struct IndexTxStateUpdater<'a> {
    schema: &'a dyn SchemaRead,
}

impl<'a> IndexTxStateUpdater<'a> {
    /// Creates an updater over the schema catalog.
    pub fn new(schema: &'a dyn SchemaRead) -> Self {
        Self { schema }
    }

    /// Records the index deltas caused by `change` of `label` on `node`.
    ///
    /// Returns the number of entries recorded. Schema or store failures are
    /// returned as-is and leave `index_tx` untouched.
    pub fn on_label_change(
        &self,
        label: LabelId,
        node: NodeId,
        change: LabelChange,
        tx: &TxState,
        store: &dyn StoreReader,
        index_tx: &mut IndexTxState,
    ) -> Result<usize> {
        let indexes = self.schema.indexes_for_label(label)?;
        if indexes.is_empty() {
            trace!(node = node.0, label = label.0, "no index on label");
            return Ok(0);
        }
        let props = storage::node_properties(tx, store, node)?;
        let entries: Vec<(IndexDescriptor, IndexEntry)> = indexes
            .into_iter()
            .filter_map(|index| {
                let entry = entry_for(&index, node, &props)?;
                Some((index, entry))
            })
            .collect();
        let mut recorded = 0usize;
        for (index, entry) in entries {
            if index_tx.record(&index, change, entry) {
                recorded += 1;
            }
            debug!(node = node.0, index = %index, ?change, "index delta recorded");
        }
        Ok(recorded)
    }
}

fn entry_for(index: &IndexDescriptor, node: NodeId, props: &[(PropId, PropValue)]) -> Option<IndexEntry> {
    let values = index
        .properties
        .iter()
        .map(|prop| {
            props
                .binary_search_by_key(prop, |(key, _)| *key)
                .ok()
                .map(|pos| props[pos].1.clone())
        })
        .collect::<Option<_>>()?;
    Some(IndexEntry { values, node })
}
