//! Kernel entry point: collaborator wiring, transactions and the operation surface.

#![forbid(unsafe_code)]

mod config;
mod metrics;
mod operations;
mod transaction;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::autoindex::{AutoIndexing, ConfiguredAutoIndexing};
use crate::index::{ExplicitIndexStore, IndexCatalog, MemoryExplicitIndexStore, SchemaRead};
use crate::locking::{LockCoordinator, LockManager};
use crate::storage::{IdAllocator, MemoryStore, StoreReader};

pub use config::{
    default_config_path, AutoIndexingConfig, ConfigError, ExplicitIndexDefaults, KernelConfig,
    LockConfig,
};
pub use metrics::{default_metrics, CounterMetrics, KernelMetrics, NoopMetrics};
pub use operations::Operations;
pub use transaction::{KernelTransaction, Status, TerminationHandle};

/// Collaborators and settings used to open a [`Kernel`].
#[derive(Clone)]
pub struct KernelOptions {
    /// Committed data reader.
    pub store: Arc<dyn StoreReader>,
    /// Node id allocator.
    pub ids: Arc<dyn IdAllocator>,
    /// Schema index definitions.
    pub schema: Arc<dyn SchemaRead>,
    /// Explicit index backing store.
    pub explicit_indexes: Arc<dyn ExplicitIndexStore>,
    /// Auto indexing hook; derived from `config` when unset.
    pub auto_indexing: Option<Arc<dyn AutoIndexing>>,
    /// Metrics sink; [`NoopMetrics`] when unset.
    pub metrics: Option<Arc<dyn KernelMetrics>>,
    /// Kernel settings.
    pub config: KernelConfig,
}

impl KernelOptions {
    /// Options over `store` and `ids` with an empty schema catalog and
    /// explicit index store.
    pub fn new(store: Arc<dyn StoreReader>, ids: Arc<dyn IdAllocator>) -> Self {
        Self {
            store,
            ids,
            schema: Arc::new(IndexCatalog::new()),
            explicit_indexes: Arc::new(MemoryExplicitIndexStore::new()),
            auto_indexing: None,
            metrics: None,
            config: KernelConfig::default(),
        }
    }

    /// Options over an in-memory store serving as both reader and allocator.
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self::new(store.clone(), store)
    }

    /// Sets the schema catalog.
    pub fn schema(mut self, schema: Arc<dyn SchemaRead>) -> Self {
        self.schema = schema;
        self
    }

    /// Sets the explicit index store.
    pub fn explicit_indexes(mut self, store: Arc<dyn ExplicitIndexStore>) -> Self {
        self.explicit_indexes = store;
        self
    }

    /// Sets the auto indexing hook.
    pub fn auto_indexing(mut self, hook: Arc<dyn AutoIndexing>) -> Self {
        self.auto_indexing = Some(hook);
        self
    }

    /// Sets the metrics sink.
    pub fn metrics(mut self, metrics: Arc<dyn KernelMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the kernel configuration.
    pub fn config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }
}

pub(crate) struct KernelServices {
    pub(crate) store: Arc<dyn StoreReader>,
    pub(crate) ids: Arc<dyn IdAllocator>,
    pub(crate) schema: Arc<dyn SchemaRead>,
    pub(crate) explicit_indexes: Arc<dyn ExplicitIndexStore>,
    pub(crate) auto_indexing: Arc<dyn AutoIndexing>,
    pub(crate) metrics: Arc<dyn KernelMetrics>,
    pub(crate) config: KernelConfig,
}

/// Shared kernel state from which transactions are started.
pub struct Kernel {
    services: Arc<KernelServices>,
    locks: LockManager,
    next_tx: AtomicU64,
}

impl Kernel {
    /// Wires the collaborators into a kernel.
    pub fn open(opts: KernelOptions) -> Self {
        let auto_indexing: Arc<dyn AutoIndexing> = match opts.auto_indexing {
            Some(hook) => hook,
            None => Arc::new(ConfiguredAutoIndexing::new(opts.config.auto_indexing.nodes)),
        };
        let metrics = opts.metrics.unwrap_or_else(default_metrics);
        let locks = LockManager::new(opts.config.lock_wait_duration());
        info!(
            node_auto_indexing = opts.config.auto_indexing.nodes,
            lock_wait_timeout_ms = ?opts.config.locks.wait_timeout_ms,
            "kernel opened"
        );
        Self {
            services: Arc::new(KernelServices {
                store: opts.store,
                ids: opts.ids,
                schema: opts.schema,
                explicit_indexes: opts.explicit_indexes,
                auto_indexing,
                metrics,
                config: opts.config,
            }),
            locks,
            next_tx: AtomicU64::new(1),
        }
    }

    /// Starts a transaction with a lock client from the kernel's lock manager.
    pub fn begin_transaction(&self) -> KernelTransaction {
        self.begin_transaction_with_locks(Box::new(self.locks.new_client()))
    }

    /// Starts a transaction that acquires locks through `locks`.
    pub fn begin_transaction_with_locks(&self, locks: Box<dyn LockCoordinator>) -> KernelTransaction {
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed);
        KernelTransaction::new(id, Arc::clone(&self.services), locks)
    }

    /// The lock manager shared by transactions of this kernel.
    pub fn lock_manager(&self) -> &LockManager {
        &self.locks
    }

    /// The active configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.services.config
    }
}
