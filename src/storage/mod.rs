//! Named cache storage
//!
//! A `CacheStorage` holds any number of named stores side by side; each
//! `NamedStore` maps request keys to cached responses. Stores are created
//! lazily by `open` and destroyed wholesale by `delete`.
//!
//! | Backend | Durability | Use |
//! |---------|------------|-----|
//! | `MemoryStorage` | process | tests, embedding |
//! | `DiskStorage` | directory tree | the `precache` CLI |

mod disk;
mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

use crate::error::PrecacheResult;
use crate::resource::{CachedEntry, ResourceResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// One cache generation's key → response mapping
#[async_trait]
pub trait NamedStore: Send + Sync {
    /// Name the store was opened under
    fn name(&self) -> &str;

    /// Write a response under `key`, replacing any previous entry
    async fn put(&self, key: &str, response: ResourceResponse) -> PrecacheResult<()>;

    /// Look up the entry stored under `key`
    async fn match_key(&self, key: &str) -> PrecacheResult<Option<CachedEntry>>;

    /// All keys currently stored, sorted
    async fn keys(&self) -> PrecacheResult<Vec<String>>;
}

/// Collection of named stores
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if absent
    async fn open(&self, name: &str) -> PrecacheResult<Arc<dyn NamedStore>>;

    /// Names of all stores, sorted
    async fn list(&self) -> PrecacheResult<Vec<String>>;

    /// Delete a store and all its entries.
    ///
    /// Returns `false` if no store by that name existed.
    async fn delete(&self, name: &str) -> PrecacheResult<bool>;

    /// Whether a store exists, without creating it
    async fn has(&self, name: &str) -> PrecacheResult<bool> {
        Ok(self.list().await?.iter().any(|n| n == name))
    }

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}
