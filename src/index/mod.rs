//! Schema index definitions, the label-change index trigger and explicit indexes.

#![forbid(unsafe_code)]

mod catalog;
mod explicit;
mod updater;

use std::fmt;
use std::mem;
use std::ops::Bound;

use smallvec::SmallVec;

use crate::types::{LabelId, PropId, PropValue, Result};

pub use catalog::IndexCatalog;
pub use explicit::{ExplicitIndexConfig, ExplicitIndexStore, MemoryExplicitIndexStore};
pub use updater::IndexTxStateUpdater;

/// A schema index over nodes with `label`, keyed by `properties` in order.
///
/// An empty property list indexes label membership alone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexDescriptor {
    /// Label the index covers.
    pub label: LabelId,
    /// Indexed property keys, in key order.
    pub properties: SmallVec<[PropId; 2]>,
}

impl IndexDescriptor {
    /// Builds a descriptor for `label` over `properties`.
    pub fn new(label: LabelId, properties: &[PropId]) -> Self {
        Self {
            label,
            properties: SmallVec::from_slice(properties),
        }
    }
}

impl fmt::Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}(", self.label)?;
        for (i, prop) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{prop}")?;
        }
        f.write_str(")")
    }
}

/// Direction of a label change, doubling as the kind of the resulting index delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LabelChange {
    /// The label was added to the node.
    Added,
    /// The label was removed from the node.
    Removed,
}

impl LabelChange {
    /// Whether a node that currently has (or lacks) the label already
    /// satisfies this change.
    pub fn is_satisfied_by(self, has_label: bool) -> bool {
        match self {
            LabelChange::Added => has_label,
            LabelChange::Removed => !has_label,
        }
    }
}

/// Ordering requested from an index read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IndexOrder {
    /// No particular order (entries are still returned ascending).
    #[default]
    None,
    /// Ascending by values, then node.
    Ascending,
    /// Descending by values, then node.
    Descending,
}

/// Predicate over one indexed property.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexQuery {
    /// The property is present.
    Exists(PropId),
    /// The property equals the value.
    Exact(PropId, PropValue),
    /// The property lies within the bounds; only values of the bounds' kind match.
    Range {
        /// Property key.
        prop: PropId,
        /// Lower bound.
        lower: Bound<PropValue>,
        /// Upper bound.
        upper: Bound<PropValue>,
    },
    /// The property is a string starting with the prefix.
    StringPrefix(PropId, String),
}

impl IndexQuery {
    /// Property key this query applies to.
    pub fn prop(&self) -> PropId {
        match self {
            IndexQuery::Exists(prop)
            | IndexQuery::Exact(prop, _)
            | IndexQuery::Range { prop, .. }
            | IndexQuery::StringPrefix(prop, _) => *prop,
        }
    }

    /// Whether `value` satisfies the query.
    pub fn matches(&self, value: &PropValue) -> bool {
        match self {
            IndexQuery::Exists(_) => true,
            IndexQuery::Exact(_, expected) => expected == value,
            IndexQuery::Range { lower, upper, .. } => {
                let lower_ok = match lower {
                    Bound::Included(b) => same_kind(b, value) && value >= b,
                    Bound::Excluded(b) => same_kind(b, value) && value > b,
                    Bound::Unbounded => true,
                };
                let upper_ok = match upper {
                    Bound::Included(b) => same_kind(b, value) && value <= b,
                    Bound::Excluded(b) => same_kind(b, value) && value < b,
                    Bound::Unbounded => true,
                };
                lower_ok && upper_ok
            }
            IndexQuery::StringPrefix(_, prefix) => value
                .as_str()
                .is_some_and(|s| s.starts_with(prefix.as_str())),
        }
    }
}

fn same_kind(a: &PropValue, b: &PropValue) -> bool {
    mem::discriminant(a) == mem::discriminant(b)
}

/// Read access to schema index definitions.
pub trait SchemaRead: Send + Sync {
    /// Indexes defined on `label`.
    fn indexes_for_label(&self, label: LabelId) -> Result<Vec<IndexDescriptor>>;

    /// The index on `label` over exactly `properties`, if defined.
    fn index(&self, label: LabelId, properties: &[PropId]) -> Result<Option<IndexDescriptor>> {
        Ok(self
            .indexes_for_label(label)?
            .into_iter()
            .find(|index| index.properties.as_slice() == properties))
    }
}
