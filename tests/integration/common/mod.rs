#![allow(dead_code)]

use std::sync::{Arc, Once};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use sombra_kernel::txstate::ExplicitIndexTxState;
use sombra_kernel::{
    AutoIndexing, CounterMetrics, EntityType, IndexCatalog, Kernel, KernelConfig, KernelOptions,
    KernelTransaction, LockCoordinator, MemoryExplicitIndexStore, MemoryStore, ResourceType,
    Result,
};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sombra_kernel=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

/// Lock coordinator that grants everything and logs each request.
#[derive(Default)]
pub struct RecordingLocks {
    held: FxHashSet<(ResourceType, u64)>,
    pub log: Arc<Mutex<Vec<(ResourceType, u64)>>>,
}

impl LockCoordinator for RecordingLocks {
    fn acquire_exclusive(&mut self, resource: ResourceType, id: u64) -> Result<()> {
        self.log.lock().push((resource, id));
        self.held.insert((resource, id));
        Ok(())
    }

    fn holds_exclusive(&self, resource: ResourceType, id: u64) -> bool {
        self.held.contains(&(resource, id))
    }

    fn release_all(&mut self) {
        self.held.clear();
    }
}

/// Auto indexing hook that only records notifications.
#[derive(Default)]
pub struct RecordingAutoIndexing {
    pub removed: Mutex<Vec<(EntityType, u64)>>,
}

impl AutoIndexing for RecordingAutoIndexing {
    fn entity_removed(
        &self,
        _state: &mut ExplicitIndexTxState,
        entity: EntityType,
        id: u64,
    ) -> Result<()> {
        self.removed.lock().push((entity, id));
        Ok(())
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<IndexCatalog>,
    pub explicit: Arc<MemoryExplicitIndexStore>,
    pub metrics: Arc<CounterMetrics>,
    pub auto_indexing: Option<Arc<RecordingAutoIndexing>>,
    pub kernel: Kernel,
}

impl Fixture {
    /// Kernel with a recording auto indexing hook.
    pub fn new() -> Self {
        Self::build(KernelConfig::default(), true)
    }

    /// Kernel whose auto indexing follows `config`.
    pub fn with_config(config: KernelConfig) -> Self {
        Self::build(config, false)
    }

    fn build(config: KernelConfig, record_auto_indexing: bool) -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(IndexCatalog::new());
        let explicit = Arc::new(MemoryExplicitIndexStore::new());
        let metrics = Arc::new(CounterMetrics::default());
        let mut opts = KernelOptions::in_memory(store.clone())
            .schema(catalog.clone())
            .explicit_indexes(explicit.clone())
            .metrics(metrics.clone())
            .config(config);
        let auto_indexing = if record_auto_indexing {
            let hook = Arc::new(RecordingAutoIndexing::default());
            opts = opts.auto_indexing(hook.clone());
            Some(hook)
        } else {
            None
        };
        let kernel = Kernel::open(opts);
        Self {
            store,
            catalog,
            explicit,
            metrics,
            auto_indexing,
            kernel,
        }
    }

    /// Starts a transaction whose lock requests are logged.
    pub fn begin_recorded(&self) -> (KernelTransaction, Arc<Mutex<Vec<(ResourceType, u64)>>>) {
        let locks = RecordingLocks::default();
        let log = locks.log.clone();
        (self.kernel.begin_transaction_with_locks(Box::new(locks)), log)
    }

    /// Auto indexing notifications seen so far.
    pub fn removals(&self) -> Vec<(EntityType, u64)> {
        self.auto_indexing
            .as_ref()
            .map(|hook| hook.removed.lock().clone())
            .unwrap_or_default()
    }
}
