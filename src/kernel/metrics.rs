use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for write-path activity.
///
/// Implementations must be cheap; every hook runs inline with a kernel
/// operation.
pub trait KernelMetrics: Send + Sync {
    /// A node was created in some transaction.
    fn node_created(&self);

    /// A node was deleted in some transaction.
    fn node_deleted(&self);

    /// A label was added to a node.
    fn label_added(&self);

    /// A label was removed from a node.
    fn label_removed(&self);

    /// An exclusive lock was requested by the write path.
    fn lock_acquired(&self);

    /// Index entries were recorded into transaction-local index state.
    fn index_entries_recorded(&self, count: usize);

    /// A call was rejected because its transaction was closed or terminated.
    fn liveness_rejected(&self);
}

/// Discards everything.
#[derive(Default)]
pub struct NoopMetrics;

impl KernelMetrics for NoopMetrics {
    fn node_created(&self) {}
    fn node_deleted(&self) {}
    fn label_added(&self) {}
    fn label_removed(&self) {}
    fn lock_acquired(&self) {}
    fn index_entries_recorded(&self, _count: usize) {}
    fn liveness_rejected(&self) {}
}

/// Atomic counters, safe to read from any thread.
#[derive(Default)]
pub struct CounterMetrics {
    /// Nodes created.
    pub nodes_created: AtomicU64,
    /// Nodes deleted.
    pub nodes_deleted: AtomicU64,
    /// Labels added.
    pub labels_added: AtomicU64,
    /// Labels removed.
    pub labels_removed: AtomicU64,
    /// Exclusive lock requests.
    pub locks_acquired: AtomicU64,
    /// Index entries recorded.
    pub index_entries_recorded: AtomicU64,
    /// Calls rejected by the liveness check.
    pub liveness_rejections: AtomicU64,
}

impl KernelMetrics for CounterMetrics {
    fn node_created(&self) {
        self.nodes_created.fetch_add(1, Ordering::Relaxed);
    }

    fn node_deleted(&self) {
        self.nodes_deleted.fetch_add(1, Ordering::Relaxed);
    }

    fn label_added(&self) {
        self.labels_added.fetch_add(1, Ordering::Relaxed);
    }

    fn label_removed(&self) {
        self.labels_removed.fetch_add(1, Ordering::Relaxed);
    }

    fn lock_acquired(&self) {
        self.locks_acquired.fetch_add(1, Ordering::Relaxed);
    }

    fn index_entries_recorded(&self, count: usize) {
        self.index_entries_recorded
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    fn liveness_rejected(&self) {
        self.liveness_rejections.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics sink, [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn KernelMetrics> {
    Arc::new(NoopMetrics)
}
