//! Identity-keyed store of the build configurations seen on the last poll

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::BuildConfig;

/// Snapshot of the collection as of the last successful sync
///
/// Clones share the same underlying map, so a listener may hold a clone
/// and observe the watcher's changes while its callbacks run.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<HashMap<String, BuildConfig>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, BuildConfig>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, BuildConfig>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace the entry for `config.id`
    pub fn insert(&self, config: BuildConfig) {
        self.write().insert(config.id.clone(), config);
    }

    pub fn remove(&self, id: &str) -> Option<BuildConfig> {
        self.write().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<BuildConfig> {
        self.read().get(id).cloned()
    }

    /// All identities currently stored
    pub fn ids(&self) -> HashSet<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
