use crate::url::VisitedKey;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe set of pages already claimed by the crawl
///
/// The only mutating operation is [`VisitedSet::mark_visited`], an atomic
/// check-and-insert. Callers enqueue a page only when that call returns
/// `true`; two workers discovering the same URL at the same time can never
/// both get `true`. Keys are never removed.
#[derive(Debug, Default)]
pub struct VisitedSet {
    keys: Mutex<HashSet<VisitedKey>>,
}

impl VisitedSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a key
    ///
    /// # Returns
    ///
    /// * `true` - This call inserted the key; the caller owns the visit
    /// * `false` - The key was already claimed
    pub fn mark_visited(&self, key: VisitedKey) -> bool {
        self.lock().insert(key)
    }

    /// Returns the number of claimed keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no key has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<VisitedKey>> {
        // A panic while holding the lock cannot leave a HashSet half-inserted.
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
