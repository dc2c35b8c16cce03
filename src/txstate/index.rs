use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::index::{IndexDescriptor, LabelChange};
use crate::types::{NodeId, PropValue};

use super::DiffSets;

/// One index entry: the indexed property values of a node, in descriptor order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexEntry {
    /// Property values in the order of the descriptor's property keys.
    pub values: SmallVec<[PropValue; 2]>,
    /// Node the entry points at.
    pub node: NodeId,
}

/// Transaction-local index changes, keyed by index descriptor.
#[derive(Debug, Default)]
pub struct IndexTxState {
    updates: FxHashMap<IndexDescriptor, DiffSets<IndexEntry>>,
}

impl IndexTxState {
    /// Creates an empty index state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one entry change for `index`.
    ///
    /// Returns `false` when the state already reflected the change.
    pub fn record(&mut self, index: &IndexDescriptor, change: LabelChange, entry: IndexEntry) -> bool {
        let diff = self.updates.entry(index.clone()).or_default();
        let changed = match change {
            LabelChange::Added => diff.add(entry),
            LabelChange::Removed => diff.remove(entry),
        };
        if diff.is_empty() {
            self.updates.remove(index);
        }
        changed
    }

    /// Changes recorded against `index`, if any.
    pub fn diff(&self, index: &IndexDescriptor) -> Option<&DiffSets<IndexEntry>> {
        self.updates.get(index)
    }

    /// Entries added to `index` in this transaction, sorted.
    pub fn added(&self, index: &IndexDescriptor) -> Vec<IndexEntry> {
        self.sorted(index, DiffSets::added)
    }

    /// Entries removed from `index` in this transaction, sorted.
    pub fn removed(&self, index: &IndexDescriptor) -> Vec<IndexEntry> {
        self.sorted(index, DiffSets::removed)
    }

    fn sorted<F>(&self, index: &IndexDescriptor, pick: F) -> Vec<IndexEntry>
    where
        F: Fn(&DiffSets<IndexEntry>) -> &rustc_hash::FxHashSet<IndexEntry>,
    {
        let mut entries: Vec<IndexEntry> = self
            .updates
            .get(index)
            .map(|diff| pick(diff).iter().cloned().collect())
            .unwrap_or_default();
        entries.sort();
        entries
    }

    /// Whether any index change is recorded.
    pub fn has_changes(&self) -> bool {
        !self.updates.is_empty()
    }

    /// Discards every recorded change.
    pub fn clear(&mut self) {
        self.updates.clear();
    }
}
