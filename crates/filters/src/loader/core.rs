//! Core [`FilterLoader`] struct: compile, dedupe and index filter instances.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use sieve_core::{FilterDefinition, FilterError, FilterRef, Result};

use crate::compiler::FilterCompiler;
use crate::factory::FilterFactory;
use crate::registry::FilterRegistry;
use crate::sync::{read, write};

use super::index::TypeIndex;

/// Collaborators the loader works with, assembled once by the application.
#[derive(Clone)]
pub struct LoaderContext {
    pub compiler: Arc<dyn FilterCompiler>,
    pub factory: Arc<dyn FilterFactory>,
    pub registry: Arc<FilterRegistry>,
}

impl LoaderContext {
    /// Context with a fresh, empty registry.
    pub fn new(compiler: Arc<dyn FilterCompiler>, factory: Arc<dyn FilterFactory>) -> Self {
        Self {
            compiler,
            factory,
            registry: Arc::new(FilterRegistry::new()),
        }
    }

    /// Share an existing registry instead of creating one.
    pub fn with_registry(mut self, registry: Arc<FilterRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

/// Sole authority turning filter sources into live instances.
///
/// Guarantees at most one live instance per identity: the registry's
/// insert-if-absent resolves concurrent loads of the same source, at the cost
/// of occasionally compiling a source twice.
pub struct FilterLoader {
    ctx: LoaderContext,
    /// Modification time recorded at the last successful load, per file identity.
    last_modified: RwLock<HashMap<String, SystemTime>>,
    /// Source text recorded at the last successful load, per inline name.
    source_code: RwLock<HashMap<String, String>>,
    /// (name, digest) pairs whose staleness has already been checked.
    /// Never cleared for the lifetime of the loader, so it grows by one
    /// 32-byte digest per distinct revision pushed under a name, not just
    /// per name.
    checked: RwLock<HashSet<(String, [u8; 32])>>,
    /// First-seen position per identity. Survives eviction so a reloaded
    /// filter keeps its place among equal priorities.
    ranks: RwLock<HashMap<String, u64>>,
    next_rank: AtomicU64,
    index: TypeIndex,
}

impl FilterLoader {
    pub fn new(ctx: LoaderContext) -> Self {
        Self {
            ctx,
            last_modified: RwLock::new(HashMap::new()),
            source_code: RwLock::new(HashMap::new()),
            checked: RwLock::new(HashSet::new()),
            ranks: RwLock::new(HashMap::new()),
            next_rank: AtomicU64::new(0),
            index: TypeIndex::default(),
        }
    }

    /// Identity of a file source: its absolute path.
    pub fn identity_for(path: &Path) -> Result<String> {
        let absolute = std::path::absolute(path).map_err(|e| FilterError::io(path, e))?;
        Ok(absolute.to_string_lossy().into_owned())
    }

    /// Load (or reload) the filter defined in `path`.
    ///
    /// Returns `true` when a new instance was built, `false` when the file is
    /// unchanged since its last load or defines an abstract filter.
    /// Compile and instantiation failures leave any previous instance live.
    pub fn load_from_file(&self, path: &Path) -> Result<bool> {
        let identity = Self::identity_for(path)?;
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| FilterError::io(path, e))?;

        // No recorded time means first sight, not staleness.
        let stale = read(&self.last_modified)
            .get(&identity)
            .is_some_and(|seen| *seen != modified);

        if !stale && self.ctx.registry.contains(&identity) {
            return Ok(false);
        }
        if stale {
            debug!(identity = %identity, "reloading filter");
        }

        let definition = self.ctx.compiler.compile_file(path)?;
        let Some(filter) = self.instantiate(&definition, &identity, stale)? else {
            return Ok(false);
        };

        self.publish(&identity, filter, stale);
        // Recorded whichever thread won the insert; some load succeeded.
        write(&self.last_modified).insert(identity, modified);
        Ok(true)
    }

    /// Load (or reload) inline filter source pushed under `name`.
    ///
    /// Returns the instance live under `name` afterwards, or `None` when the
    /// source is abstract. Each distinct `(name, code)` pair is compared with
    /// the last loaded text only once per loader lifetime, so re-pushing code
    /// that was seen before does not displace the current instance.
    pub fn load_from_source(&self, code: &str, name: &str) -> Result<Option<FilterRef>> {
        let digest: [u8; 32] = Sha256::digest(code.as_bytes()).into();
        let key = (name.to_string(), digest);
        let first_check = !read(&self.checked).contains(&key);

        let stale = first_check
            && read(&self.source_code).get(name).map(String::as_str) != Some(code);

        if !stale {
            if let Some(existing) = self.ctx.registry.get(name) {
                write(&self.checked).insert(key);
                return Ok(Some(existing));
            }
        }
        if stale && self.ctx.registry.contains(name) {
            info!(name = %name, "reloading inline filter");
        }

        // A failed compile leaves the pair unchecked so the next push retries it.
        let definition = self.ctx.compiler.compile_source(code, name)?;
        let Some(filter) = self.instantiate(&definition, name, stale)? else {
            write(&self.checked).insert(key);
            return Ok(None);
        };

        self.publish(name, Arc::clone(&filter), stale);
        write(&self.source_code).insert(name.to_string(), code.to_string());
        write(&self.checked).insert(key);
        Ok(Some(self.ctx.registry.get(name).unwrap_or(filter)))
    }

    /// Live filters of `filter_type`, ascending by priority, ties in discovery order.
    pub fn filters_by_type(&self, filter_type: &str) -> Arc<[FilterRef]> {
        self.index.get_or_build(&self.ctx.registry, filter_type, |id| self.rank_of(id))
    }

    /// Distinct filter types currently live, sorted.
    pub fn filter_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .ctx
            .registry
            .all_filters()
            .iter()
            .map(|f| f.filter_type().to_string())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Total number of live filter instances.
    pub fn len(&self) -> usize {
        self.ctx.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctx.registry.is_empty()
    }

    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.ctx.registry
    }

    /// Build an instance unless the definition is abstract. A stale source
    /// that became abstract has its old instance evicted.
    fn instantiate(
        &self,
        definition: &FilterDefinition,
        identity: &str,
        stale: bool,
    ) -> Result<Option<FilterRef>> {
        if !definition.is_instantiable() {
            if stale {
                self.evict(identity);
            }
            debug!(identity = %identity, name = %definition.name, "skipping abstract filter");
            return Ok(None);
        }
        self.ctx.factory.new_instance(definition).map(Some)
    }

    /// Swap `filter` in under `identity`, evicting the stale instance first.
    fn publish(&self, identity: &str, filter: FilterRef, stale: bool) {
        if stale {
            self.evict(identity);
        }
        let filter_type = filter.filter_type().to_string();
        let name = filter.name().to_string();
        let priority = filter.priority();

        self.assign_rank(identity);
        if self.ctx.registry.put(identity, filter) {
            info!(
                identity = %identity,
                name = %name,
                filter_type = %filter_type,
                priority,
                "loaded filter"
            );
        } else {
            debug!(identity = %identity, "filter already loaded by a concurrent caller");
        }
        self.index.invalidate(&filter_type);
    }

    /// Give `identity` the next rank unless it already has one.
    fn assign_rank(&self, identity: &str) {
        if read(&self.ranks).contains_key(identity) {
            return;
        }
        write(&self.ranks)
            .entry(identity.to_string())
            .or_insert_with(|| self.next_rank.fetch_add(1, Ordering::Relaxed));
    }

    /// Identities put into a shared registry by someone else sort last.
    fn rank_of(&self, identity: &str) -> u64 {
        read(&self.ranks).get(identity).copied().unwrap_or(u64::MAX)
    }

    fn evict(&self, identity: &str) {
        if let Some(old) = self.ctx.registry.remove(identity) {
            self.index.invalidate(old.filter_type());
        }
    }

    #[cfg(test)]
    pub(super) fn index(&self) -> &TypeIndex {
        &self.index
    }
}
