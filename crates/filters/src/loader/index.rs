//! Derived per-type cache over the registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sieve_core::FilterRef;

use crate::registry::FilterRegistry;
use crate::sync::{read, write};

/// Lazily built, coarsely invalidated `type -> [filter]` cache.
///
/// Lists are sorted ascending by `(priority, rank)`, where `rank` is the
/// first-seen position of the filter's identity. A reload keeps its rank, so
/// ties stay in discovery order however often a source is replaced.
#[derive(Default)]
pub(super) struct TypeIndex {
    by_type: RwLock<HashMap<String, Arc<[FilterRef]>>>,
}

impl TypeIndex {
    pub(super) fn get_or_build(
        &self,
        registry: &FilterRegistry,
        filter_type: &str,
        rank: impl Fn(&str) -> u64,
    ) -> Arc<[FilterRef]> {
        if let Some(list) = read(&self.by_type).get(filter_type) {
            return Arc::clone(list);
        }

        let generation = registry.generation();
        let list: Arc<[FilterRef]> = build(registry.entries(), filter_type, rank).into();

        // A list built from a snapshot that a concurrent load has since
        // changed is returned but not cached.
        let mut by_type = write(&self.by_type);
        if registry.generation() != generation {
            return list;
        }
        Arc::clone(by_type.entry(filter_type.to_string()).or_insert(list))
    }

    pub(super) fn invalidate(&self, filter_type: &str) {
        if write(&self.by_type).remove(filter_type).is_some() {
            tracing::trace!(filter_type, "invalidated filter index");
        }
    }

    #[cfg(test)]
    pub(super) fn is_cached(&self, filter_type: &str) -> bool {
        read(&self.by_type).contains_key(filter_type)
    }
}

/// Entries without a rank sort after ranked ones, in registry order.
fn build(
    snapshot: Vec<(String, FilterRef)>,
    filter_type: &str,
    rank: impl Fn(&str) -> u64,
) -> Vec<FilterRef> {
    let mut ranked: Vec<(i32, u64, FilterRef)> = snapshot
        .into_iter()
        .filter(|(_, f)| f.filter_type() == filter_type)
        .map(|(id, f)| (f.priority(), rank(&id), f))
        .collect();
    ranked.sort_by_key(|(priority, rank, _)| (*priority, *rank));
    ranked.into_iter().map(|(_, _, f)| f).collect()
}
