//! Identifiers, property values and the kernel error type shared by every module.

#![forbid(unsafe_code)]

use std::fmt;

mod value;

pub use value::PropValue;

use crate::kernel::Status;
use crate::locking::ResourceType;

/// Identifier of a node. Node ids are 64-bit and allocated by the store.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeId(pub u64);
/// Identifier of a relationship.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RelId(pub u64);
/// Identifier of a node label.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct LabelId(pub u32);
/// Identifier of a relationship type.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TypeId(pub u32);
/// Identifier of a property key.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PropId(pub u32);

/// Kind of graph entity an identifier refers to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum EntityType {
    /// A node.
    Node,
    /// A relationship.
    Relationship,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Node => f.write_str("node"),
            EntityType::Relationship => f.write_str("relationship"),
        }
    }
}

/// Errors surfaced by kernel operations and their collaborators.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// The owning transaction has been closed.
    #[error("the transaction has been closed")]
    NotInTransaction,
    /// The owning transaction was terminated; carries the reason.
    #[error("the transaction has been terminated: {0}")]
    TransactionTerminated(Status),
    /// A write targeted an entity that exists neither in the transaction nor in the store.
    #[error("unable to load {entity} with id {id}")]
    EntityNotFound {
        /// Kind of the missing entity.
        entity: EntityType,
        /// Raw identifier of the missing entity.
        id: u64,
    },
    /// The operation is not available on this write path.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// The lock manager gave up waiting for a conflicting holder.
    #[error("timed out waiting for exclusive {resource} lock on {id}")]
    LockWaitTimeout {
        /// Resource type of the contended lock.
        resource: ResourceType,
        /// Resource id of the contended lock.
        id: u64,
    },
    /// The named explicit index does not exist in the backing store.
    #[error("explicit index '{0}' not found")]
    ExplicitIndexNotFound(String),
    /// An explicit index exists with a configuration that conflicts with the requested one.
    #[error("explicit index '{name}' exists with a different value for '{key}'")]
    ExplicitIndexConfigMismatch {
        /// Index name.
        name: String,
        /// First configuration key that differs.
        key: String,
    },
    /// Failure reported by the committed store.
    #[error("storage: {0}")]
    Storage(String),
    /// Invalid argument supplied by the caller.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, KernelError>;

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LabelId {
    fn from(value: u32) -> Self {
        LabelId(value)
    }
}

impl From<LabelId> for u32 {
    fn from(value: LabelId) -> Self {
        value.0
    }
}

impl From<u32> for TypeId {
    fn from(value: u32) -> Self {
        TypeId(value)
    }
}

impl From<u32> for PropId {
    fn from(value: u32) -> Self {
        PropId(value)
    }
}

impl From<PropId> for u32 {
    fn from(value: PropId) -> Self {
        value.0
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

impl From<u64> for RelId {
    fn from(value: u64) -> Self {
        RelId(value)
    }
}
