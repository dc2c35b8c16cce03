use rustc_hash::{FxHashMap, FxHashSet};

/// Pending explicit index changes of one transaction, keyed by index name.
#[derive(Debug, Default)]
pub struct ExplicitIndexTxState {
    node_removals: FxHashMap<String, FxHashSet<u64>>,
}

impl ExplicitIndexTxState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records removal of `node` from the node index `index`.
    pub fn remove_node(&mut self, index: &str, node: u64) -> bool {
        match self.node_removals.get_mut(index) {
            Some(nodes) => nodes.insert(node),
            None => {
                let mut nodes = FxHashSet::default();
                nodes.insert(node);
                self.node_removals.insert(index.to_owned(), nodes);
                true
            }
        }
    }

    /// Whether `node` was removed from `index` in this transaction.
    pub fn is_node_removed(&self, index: &str, node: u64) -> bool {
        self.node_removals
            .get(index)
            .is_some_and(|nodes| nodes.contains(&node))
    }

    /// Nodes removed from `index`, sorted.
    pub fn removed_nodes(&self, index: &str) -> Vec<u64> {
        let mut nodes: Vec<u64> = self
            .node_removals
            .get(index)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        nodes.sort_unstable();
        nodes
    }

    /// Whether any explicit index change is recorded.
    pub fn has_changes(&self) -> bool {
        !self.node_removals.is_empty()
    }

    /// Discards every recorded change.
    pub fn clear(&mut self) {
        self.node_removals.clear();
    }
}
