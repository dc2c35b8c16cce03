use std::hash::Hash;

use rustc_hash::FxHashSet;

/// Pair of added/removed sets describing a change relative to committed state.
///
/// An element is never in both sets: adding an element that is recorded as
/// removed cancels the removal and vice versa.
#[derive(Clone, Debug)]
pub struct DiffSets<T: Eq + Hash> {
    added: FxHashSet<T>,
    removed: FxHashSet<T>,
}

impl<T: Eq + Hash> Default for DiffSets<T> {
    fn default() -> Self {
        Self {
            added: FxHashSet::default(),
            removed: FxHashSet::default(),
        }
    }
}

impl<T: Eq + Hash + Clone> DiffSets<T> {
    /// Creates an empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `elem` as added. Returns `false` when the diff already said so.
    pub fn add(&mut self, elem: T) -> bool {
        if self.removed.remove(&elem) {
            return true;
        }
        self.added.insert(elem)
    }

    /// Records `elem` as removed. Returns `false` when the diff already said so.
    pub fn remove(&mut self, elem: T) -> bool {
        if self.added.remove(&elem) {
            return true;
        }
        self.removed.insert(elem)
    }

    /// Whether `elem` is recorded as added.
    pub fn is_added(&self, elem: &T) -> bool {
        self.added.contains(elem)
    }

    /// Whether `elem` is recorded as removed.
    pub fn is_removed(&self, elem: &T) -> bool {
        self.removed.contains(elem)
    }

    /// Elements added in this diff.
    pub fn added(&self) -> &FxHashSet<T> {
        &self.added
    }

    /// Elements removed in this diff.
    pub fn removed(&self) -> &FxHashSet<T> {
        &self.removed
    }

    /// Whether the diff records no change.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Applies the diff to a committed membership answer.
    pub fn apply(&self, elem: &T, committed: bool) -> bool {
        if self.added.contains(elem) {
            true
        } else if self.removed.contains(elem) {
            false
        } else {
            committed
        }
    }
}
