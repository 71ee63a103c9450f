//! Caller-owned memoization for dependency resolution

use crate::stack::DependencyMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Resolved dependency maps keyed by codebase root
#[derive(Debug, Default)]
pub struct DependencyCache {
    entries: Mutex<HashMap<PathBuf, DependencyMap>>,
}

impl DependencyCache {
    pub fn get(&self, root: &Path) -> Option<DependencyMap> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(root).cloned())
    }

    pub fn insert(&self, root: &Path, deps: DependencyMap) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(root.to_path_buf(), deps);
        }
    }

    /// Return the cached map for `root`, computing and storing it on a miss
    pub fn get_or_insert_with(
        &self,
        root: &Path,
        resolve: impl FnOnce() -> DependencyMap,
    ) -> DependencyMap {
        if let Some(hit) = self.get(root) {
            return hit;
        }
        let deps = resolve();
        self.insert(root, deps.clone());
        deps
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State shared by every discovery step of one run.
///
/// Construct one per run (or per group of runs that may share results); nothing
/// here is process-global.
#[derive(Debug, Default)]
pub struct DiscoveryContext {
    pub dependency_cache: DependencyCache,
}
