//! Notification hook that keeps automatic explicit indexes in step with deletions.

#![forbid(unsafe_code)]

use tracing::trace;

use crate::txstate::ExplicitIndexTxState;
use crate::types::{EntityType, Result};

/// Name of the explicit index maintained for nodes.
pub const NODE_AUTO_INDEX: &str = "node_auto_index";

/// Receives entity removals from the write path.
pub trait AutoIndexing: Send + Sync {
    /// Called once for every entity the transaction deletes, before the
    /// overlay records the deletion.
    fn entity_removed(
        &self,
        state: &mut ExplicitIndexTxState,
        entity: EntityType,
        id: u64,
    ) -> Result<()>;
}

/// Auto indexing driven by configuration flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredAutoIndexing {
    nodes: bool,
}

impl ConfiguredAutoIndexing {
    /// Creates the hook; `nodes` enables `node_auto_index` maintenance.
    pub fn new(nodes: bool) -> Self {
        Self { nodes }
    }
}

impl AutoIndexing for ConfiguredAutoIndexing {
    fn entity_removed(
        &self,
        state: &mut ExplicitIndexTxState,
        entity: EntityType,
        id: u64,
    ) -> Result<()> {
        if entity == EntityType::Node && self.nodes {
            trace!(node = id, index = NODE_AUTO_INDEX, "auto index removal");
            state.remove_node(NODE_AUTO_INDEX, id);
        }
        Ok(())
    }
}
