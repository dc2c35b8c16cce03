//! Exclusive entity locks shared between transactions.
//!
//! The write path only ever asks for exclusive locks and never releases them
//! itself: a [`LockClient`] belongs to one transaction and hands everything
//! back when that transaction closes or the client is dropped.

#![forbid(unsafe_code)]

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::types::{KernelError, Result};

/// Kind of resource a lock protects.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ResourceType {
    /// A node record.
    Node,
    /// A relationship record.
    Relationship,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Node => f.write_str("NODE"),
            ResourceType::Relationship => f.write_str("RELATIONSHIP"),
        }
    }
}

/// Per-transaction lock acquisition context consumed by the operations layer.
///
/// `acquire_exclusive` may block for as long as the implementation's own
/// policy allows; no timeout is passed from the caller.
pub trait LockCoordinator: Send {
    /// Takes an exclusive lock on `(resource, id)` for the rest of the transaction.
    fn acquire_exclusive(&mut self, resource: ResourceType, id: u64) -> Result<()>;

    /// Whether this context already holds the exclusive lock.
    fn holds_exclusive(&self, resource: ResourceType, id: u64) -> bool;

    /// Releases every lock held by this context.
    fn release_all(&mut self);
}

type LockKey = (ResourceType, u64);

struct Inner {
    owners: Mutex<FxHashMap<LockKey, u64>>,
    released: Condvar,
    next_client: AtomicU64,
    wait_timeout: Option<Duration>,
}

/// Process-wide table of exclusive locks.
#[derive(Clone)]
pub struct LockManager {
    inner: Arc<Inner>,
}

/// Snapshot of lock table state for observability.
#[derive(Default, Debug, Clone, Copy)]
pub struct LockSnapshot {
    /// Number of exclusive locks currently held across all clients.
    pub held: usize,
}

impl LockManager {
    /// Creates a lock manager. `wait_timeout` bounds how long a conflicting
    /// acquisition waits; `None` waits indefinitely.
    pub fn new(wait_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                owners: Mutex::new(FxHashMap::default()),
                released: Condvar::new(),
                next_client: AtomicU64::new(1),
                wait_timeout,
            }),
        }
    }

    /// Opens a new client for one transaction.
    pub fn new_client(&self) -> LockClient {
        let id = self.inner.next_client.fetch_add(1, Ordering::Relaxed);
        LockClient {
            id,
            manager: self.clone(),
            held: FxHashSet::default(),
        }
    }

    /// Returns the client id currently holding `(resource, id)`, if any.
    pub fn holder(&self, resource: ResourceType, id: u64) -> Option<u64> {
        self.inner.owners.lock().get(&(resource, id)).copied()
    }

    /// Returns a snapshot of the lock table.
    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            held: self.inner.owners.lock().len(),
        }
    }

    fn acquire(&self, client: u64, key: LockKey) -> Result<()> {
        let deadline = self.inner.wait_timeout.map(|timeout| Instant::now() + timeout);
        let mut owners = self.inner.owners.lock();
        loop {
            match owners.get(&key) {
                None => {
                    owners.insert(key, client);
                    trace!(client, resource = %key.0, id = key.1, "lock granted");
                    return Ok(());
                }
                Some(&owner) if owner == client => return Ok(()),
                Some(&owner) => {
                    debug!(client, owner, resource = %key.0, id = key.1, "waiting for lock");
                    match deadline {
                        Some(deadline) => {
                            if self
                                .inner
                                .released
                                .wait_until(&mut owners, deadline)
                                .timed_out()
                                && owners.get(&key).is_some_and(|o| *o != client)
                            {
                                warn!(client, resource = %key.0, id = key.1, "lock wait timed out");
                                return Err(KernelError::LockWaitTimeout {
                                    resource: key.0,
                                    id: key.1,
                                });
                            }
                        }
                        None => self.inner.released.wait(&mut owners),
                    }
                }
            }
        }
    }

    fn release(&self, client: u64, keys: impl IntoIterator<Item = LockKey>) {
        let mut owners = self.inner.owners.lock();
        let mut released = 0usize;
        for key in keys {
            if owners.get(&key) == Some(&client) {
                owners.remove(&key);
                released += 1;
            }
        }
        drop(owners);
        if released > 0 {
            trace!(client, released, "locks released");
            self.inner.released.notify_all();
        }
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Lock context of a single transaction.
pub struct LockClient {
    id: u64,
    manager: LockManager,
    held: FxHashSet<LockKey>,
}

impl LockClient {
    /// Identifier of this client within its manager.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of distinct locks held.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

impl LockCoordinator for LockClient {
    fn acquire_exclusive(&mut self, resource: ResourceType, id: u64) -> Result<()> {
        let key = (resource, id);
        if self.held.contains(&key) {
            return Ok(());
        }
        self.manager.acquire(self.id, key)?;
        self.held.insert(key);
        Ok(())
    }

    fn holds_exclusive(&self, resource: ResourceType, id: u64) -> bool {
        self.held.contains(&(resource, id))
    }

    fn release_all(&mut self) {
        if self.held.is_empty() {
            return;
        }
        let keys: Vec<LockKey> = self.held.drain().collect();
        self.manager.release(self.id, keys);
    }
}

impl Drop for LockClient {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl fmt::Debug for LockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockClient")
            .field("id", &self.id)
            .field("held", &self.held.len())
            .finish()
    }
}
