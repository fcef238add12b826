use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Set of keys with a background task running in this process
///
/// Dedups spawned work per key. Cross-instance safety comes from segment
/// claims, not from this set.
pub(crate) struct InFlight<K: Eq + Hash> {
    entries: Arc<DashMap<K, ()>>,
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Mark `key` busy, or `None` if it already is
    pub(crate) fn try_acquire(&self, key: K) -> Option<InFlightGuard<K>> {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightGuard {
                    entries: Arc::clone(&self.entries),
                    key,
                })
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }
}

/// Clears its key when dropped
pub(crate) struct InFlightGuard<K: Eq + Hash> {
    entries: Arc<DashMap<K, ()>>,
    key: K,
}

impl<K: Eq + Hash> Drop for InFlightGuard<K> {
    fn drop(&mut self) {
        self.entries.remove(&self.key);
    }
}
