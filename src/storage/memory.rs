//! In-memory storage backend

use super::{CacheStorage, NamedStore};
use crate::error::{PrecacheError, PrecacheResult};
use crate::resource::{CachedEntry, ResourceResponse};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

type Entries = Arc<Mutex<BTreeMap<String, CachedEntry>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the guard leaves the map itself consistent
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local storage.
///
/// Supports an optional per-store entry quota and injected deletion
/// failures so storage faults can be exercised without a real disk.
#[derive(Default)]
pub struct MemoryStorage {
    stores: Mutex<BTreeMap<String, Entries>>,
    quota: Option<usize>,
    failing_deletes: Mutex<HashSet<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit every store to `max_entries` entries
    pub fn with_quota(max_entries: usize) -> Self {
        Self {
            quota: Some(max_entries),
            ..Self::default()
        }
    }

    /// Make deletion of `name` fail until `heal_deletes` is called
    pub fn fail_deletes_for(&self, name: &str) {
        lock(&self.failing_deletes).insert(name.to_string());
    }

    /// Clear all injected deletion failures
    pub fn heal_deletes(&self) {
        lock(&self.failing_deletes).clear();
    }

    /// Number of entries in a store, `None` if it does not exist
    pub fn entry_count(&self, name: &str) -> Option<usize> {
        lock(&self.stores)
            .get(name)
            .map(|entries| lock(entries).len())
    }
}

struct MemoryStore {
    name: String,
    entries: Entries,
    quota: Option<usize>,
}

#[async_trait]
impl NamedStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, response: ResourceResponse) -> PrecacheResult<()> {
        let mut entries = lock(&self.entries);
        if let Some(max) = self.quota {
            if !entries.contains_key(key) && entries.len() >= max {
                return Err(PrecacheError::StorageQuota {
                    store: self.name.clone(),
                    key: key.to_string(),
                });
            }
        }
        entries.insert(key.to_string(), CachedEntry::new(key, response));
        Ok(())
    }

    async fn match_key(&self, key: &str) -> PrecacheResult<Option<CachedEntry>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        Ok(lock(&self.entries).keys().cloned().collect())
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> PrecacheResult<Arc<dyn NamedStore>> {
        let entries = lock(&self.stores)
            .entry(name.to_string())
            .or_default()
            .clone();

        Ok(Arc::new(MemoryStore {
            name: name.to_string(),
            entries,
            quota: self.quota,
        }))
    }

    async fn list(&self) -> PrecacheResult<Vec<String>> {
        Ok(lock(&self.stores).keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> PrecacheResult<bool> {
        if lock(&self.failing_deletes).contains(name) {
            return Err(PrecacheError::storage(name, "deletion refused"));
        }
        Ok(lock(&self.stores).remove(name).is_some())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
