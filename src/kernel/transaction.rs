use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::locking::LockCoordinator;
use crate::txstate::{ExplicitIndexTxState, IndexTxState, TxState};
use crate::types::{KernelError, Result};

use super::operations::Operations;
use super::KernelServices;

/// Reason a transaction was terminated from outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Terminated on request, for example by an administrator.
    Terminated,
    /// A previous failure marked the transaction as unusable.
    TransactionMarkedAsFailed,
    /// The lock client backing the transaction was stopped.
    LockClientStopped,
    /// The lock manager chose this transaction as a deadlock victim.
    DeadlockDetected,
    /// The transaction outlived the state it was reading.
    Outdated,
    /// The owning thread was interrupted.
    Interrupted,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Terminated => "terminated",
            Status::TransactionMarkedAsFailed => "marked as failed",
            Status::LockClientStopped => "lock client stopped",
            Status::DeadlockDetected => "deadlock detected",
            Status::Outdated => "outdated",
            Status::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}

/// Shared handle that can terminate a transaction from another thread.
///
/// The first reason set wins; later calls are ignored.
#[derive(Clone, Debug, Default)]
pub struct TerminationHandle {
    reason: Arc<Mutex<Option<Status>>>,
}

impl TerminationHandle {
    /// Sets the termination reason. Returns `false` if one was already set.
    pub fn mark(&self, reason: Status) -> bool {
        let mut slot = self.reason.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(reason);
        true
    }

    /// The termination reason, if set.
    pub fn reason(&self) -> Option<Status> {
        *self.reason.lock()
    }
}

/// One open unit of work against the kernel.
///
/// Owns the transaction overlay and lock context. Writes and reads go through
/// [`KernelTransaction::operations`]; nothing here is shared with other
/// transactions except the termination handle.
pub struct KernelTransaction {
    pub(crate) id: u64,
    pub(crate) services: Arc<KernelServices>,
    pub(crate) open: bool,
    pub(crate) termination: TerminationHandle,
    pub(crate) tx_state: TxState,
    pub(crate) index_tx_state: IndexTxState,
    pub(crate) explicit_tx_state: ExplicitIndexTxState,
    pub(crate) locks: Box<dyn LockCoordinator>,
}

impl KernelTransaction {
    pub(crate) fn new(id: u64, services: Arc<KernelServices>, locks: Box<dyn LockCoordinator>) -> Self {
        debug!(tx = id, "transaction begun");
        Self {
            id,
            services,
            open: true,
            termination: TerminationHandle::default(),
            tx_state: TxState::new(),
            index_tx_state: IndexTxState::new(),
            explicit_tx_state: ExplicitIndexTxState::new(),
            locks,
        }
    }

    /// Transaction id, unique within its kernel.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the transaction has not been closed yet.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The termination reason, if the transaction was terminated.
    pub fn reason_if_terminated(&self) -> Option<Status> {
        self.termination.reason()
    }

    /// Terminates the transaction. The next operation call fails with
    /// [`KernelError::TransactionTerminated`].
    pub fn mark_for_termination(&self, reason: Status) -> bool {
        let marked = self.termination.mark(reason);
        if marked {
            info!(tx = self.id, %reason, "transaction marked for termination");
        }
        marked
    }

    /// A handle other threads can use to terminate this transaction.
    pub fn termination_handle(&self) -> TerminationHandle {
        self.termination.clone()
    }

    /// The node overlay.
    pub fn tx_state(&self) -> &TxState {
        &self.tx_state
    }

    /// Transaction-local schema index deltas.
    pub fn index_tx_state(&self) -> &IndexTxState {
        &self.index_tx_state
    }

    /// Transaction-local explicit index changes.
    pub fn explicit_index_tx_state(&self) -> &ExplicitIndexTxState {
        &self.explicit_tx_state
    }

    /// The lock context held by this transaction.
    pub fn locks(&self) -> &dyn LockCoordinator {
        self.locks.as_ref()
    }

    /// Whether the transaction recorded any change.
    pub fn has_tx_state_with_changes(&self) -> bool {
        self.tx_state.has_changes()
            || self.index_tx_state.has_changes()
            || self.explicit_tx_state.has_changes()
    }

    /// The operation surface bound to this transaction.
    pub fn operations(&mut self) -> Operations<'_> {
        Operations::new(self)
    }

    /// Ends the transaction: releases every lock and discards all
    /// transaction-local state. Persisting changes is not done here.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(KernelError::NotInTransaction);
        }
        let had_changes = self.has_tx_state_with_changes();
        self.open = false;
        self.locks.release_all();
        self.tx_state.clear();
        self.index_tx_state.clear();
        self.explicit_tx_state.clear();
        debug!(tx = self.id, had_changes, "transaction closed");
        Ok(())
    }
}

impl Drop for KernelTransaction {
    fn drop(&mut self) {
        if self.open {
            self.locks.release_all();
        }
    }
}

impl fmt::Debug for KernelTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelTransaction")
            .field("id", &self.id)
            .field("open", &self.open)
            .field("terminated", &self.termination.reason())
            .finish()
    }
}
