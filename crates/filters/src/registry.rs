//! Identity-keyed store of live filter instances.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use indexmap::map::Entry;
use indexmap::IndexMap;

use sieve_core::FilterRef;

use crate::sync::{read, write};

/// Thread-safe identity → filter store with insert-if-absent semantics.
///
/// Entries are kept in insertion order so that snapshots list filters in the
/// order they were discovered. Replacing an entry requires an explicit
/// [`remove`](FilterRegistry::remove) first; [`put`](FilterRegistry::put)
/// never overwrites a live instance.
#[derive(Default)]
pub struct FilterRegistry {
    filters: RwLock<IndexMap<String, FilterRef>>,
    /// Bumped on every successful mutation.
    generation: AtomicU64,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the live instance for an identity.
    pub fn get(&self, id: &str) -> Option<FilterRef> {
        read(&self.filters).get(id).cloned()
    }

    /// Insert only if `id` is absent. Returns whether the insert happened.
    pub fn put(&self, id: impl Into<String>, filter: FilterRef) -> bool {
        let mut filters = write(&self.filters);
        match filters.entry(id.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(filter);
                self.generation.fetch_add(1, Ordering::AcqRel);
                true
            }
        }
    }

    /// Remove and return the instance for `id`. Removing an absent id is a no-op.
    pub fn remove(&self, id: &str) -> Option<FilterRef> {
        let removed = write(&self.filters).shift_remove(id);
        if removed.is_some() {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        read(&self.filters).contains_key(id)
    }

    pub fn len(&self) -> usize {
        read(&self.filters).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.filters).is_empty()
    }

    /// Point-in-time copy of every live instance, in insertion order.
    pub fn all_filters(&self) -> Vec<FilterRef> {
        read(&self.filters).values().cloned().collect()
    }

    /// Point-in-time copy of every `(identity, instance)` pair, in insertion order.
    pub fn entries(&self) -> Vec<(String, FilterRef)> {
        read(&self.filters)
            .iter()
            .map(|(id, filter)| (id.clone(), FilterRef::clone(filter)))
            .collect()
    }

    /// Point-in-time copy of every registered identity.
    pub fn ids(&self) -> Vec<String> {
        read(&self.filters).keys().cloned().collect()
    }

    /// Mutation counter, used by derived caches to detect concurrent changes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
