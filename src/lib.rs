//! Transactional write path of the Sombra graph kernel.
//!
//! A [`KernelTransaction`] records node creations, deletions and label
//! changes in a private overlay, takes exclusive node locks where committed
//! data is involved and keeps transaction-local index deltas in step with
//! every label change. Reads made through the same transaction see the
//! committed store with the overlay applied.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sombra_kernel::{Kernel, KernelOptions, LabelId, MemoryStore};
//!
//! # fn main() -> sombra_kernel::Result<()> {
//! let kernel = Kernel::open(KernelOptions::in_memory(Arc::new(MemoryStore::new())));
//! let mut tx = kernel.begin_transaction();
//! let mut ops = tx.operations();
//! let node = ops.node_create()?;
//! ops.node_add_label(node, LabelId(1))?;
//! assert_eq!(ops.node_labels(node)?.as_deref(), Some(&[LabelId(1)][..]));
//! tx.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod autoindex;
pub mod index;
pub mod kernel;
pub mod locking;
pub mod storage;
pub mod txstate;
pub mod types;

pub use autoindex::{AutoIndexing, ConfiguredAutoIndexing, NODE_AUTO_INDEX};
pub use index::{
    ExplicitIndexConfig, ExplicitIndexStore, IndexCatalog, IndexDescriptor, IndexOrder, IndexQuery,
    LabelChange, MemoryExplicitIndexStore, SchemaRead,
};
pub use kernel::{
    ConfigError, CounterMetrics, Kernel, KernelConfig, KernelMetrics, KernelOptions,
    KernelTransaction, NoopMetrics, Operations, Status, TerminationHandle,
};
pub use locking::{LockClient, LockCoordinator, LockManager, ResourceType};
pub use storage::{Dir, IdAllocator, MemoryStore, NodeRecord, RelationshipRecord, StoreReader, StoreView};
pub use txstate::{IndexEntry, TxState};
pub use types::{
    EntityType, KernelError, LabelId, NodeId, PropId, PropValue, RelId, Result, TypeId,
};
