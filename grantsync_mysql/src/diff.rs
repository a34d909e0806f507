//! Privilege diffing for in-place grant updates.

use grantsync_core::privileges::canonicalize;
use indexmap::IndexSet;

/// Privileges to add and remove to go from one privilege list to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeDiff {
    /// Privileges in the new list but not the old, in new-list order
    pub added: Vec<String>,
    /// Privileges in the old list but not the new, in old-list order
    pub removed: Vec<String>,
}

impl PrivilegeDiff {
    /// True when the two lists hold the same privileges.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compare two privilege lists as sets. Both sides are canonicalized first,
/// so `select` and `SELECT` are the same privilege.
pub fn diff_privileges<S: AsRef<str>, T: AsRef<str>>(old: &[S], new: &[T]) -> PrivilegeDiff {
    let old = canonicalize(old).into_iter().collect::<IndexSet<_>>();
    let new = canonicalize(new).into_iter().collect::<IndexSet<_>>();
    PrivilegeDiff {
        added: new.difference(&old).cloned().collect(),
        removed: old.difference(&new).cloned().collect(),
    }
}
