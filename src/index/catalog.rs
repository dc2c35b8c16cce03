use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::info;

use crate::types::{LabelId, PropId, Result};

use super::{IndexDescriptor, SchemaRead};

/// In-memory registry of schema indexes.
#[derive(Debug, Default)]
pub struct IndexCatalog {
    by_label: RwLock<FxHashMap<LabelId, Vec<IndexDescriptor>>>,
}

impl IndexCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines an index on `label` over `properties`. Returns the existing
    /// descriptor if an identical index is already defined.
    pub fn create_index(&self, label: LabelId, properties: &[PropId]) -> IndexDescriptor {
        let descriptor = IndexDescriptor::new(label, properties);
        let mut by_label = self.by_label.write();
        let indexes = by_label.entry(label).or_default();
        if !indexes.contains(&descriptor) {
            indexes.push(descriptor.clone());
            indexes.sort();
            info!(index = %descriptor, "schema index created");
        }
        descriptor
    }

    /// Drops the index. Returns whether it was defined.
    pub fn drop_index(&self, index: &IndexDescriptor) -> bool {
        let mut by_label = self.by_label.write();
        let Some(indexes) = by_label.get_mut(&index.label) else {
            return false;
        };
        let before = indexes.len();
        indexes.retain(|existing| existing != index);
        let dropped = indexes.len() != before;
        if indexes.is_empty() {
            by_label.remove(&index.label);
        }
        if dropped {
            info!(index = %index, "schema index dropped");
        }
        dropped
    }
}

impl SchemaRead for IndexCatalog {
    fn indexes_for_label(&self, label: LabelId) -> Result<Vec<IndexDescriptor>> {
        Ok(self
            .by_label
            .read()
            .get(&label)
            .cloned()
            .unwrap_or_default())
    }
}
