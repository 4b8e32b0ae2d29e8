//! Directory-backed storage backend
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<hex(store name)>/<sha256(key)[..16]>.json   entry metadata
//! <root>/<hex(store name)>/<sha256(key)[..16]>.body   raw response body
//! ```
//!
//! The body is written before the metadata, and both are renamed into place,
//! so an entry is visible only once it is complete.

use super::{CacheStorage, NamedStore};
use crate::error::{PrecacheError, PrecacheResult};
use crate::resource::{CachedEntry, ResourceResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

/// Metadata persisted next to each body file
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    status: u16,
    headers: BTreeMap<String, String>,
    cached_at: DateTime<Utc>,
}

/// Storage rooted at a directory, one subdirectory per named store
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Create storage rooted at `root` (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(hex::encode(name.as_bytes()))
    }
}

/// Stem shared by an entry's metadata and body files
fn entry_stem(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Decode a store directory name back to the store name
fn decode_store_name(dir_name: &str) -> Option<String> {
    let bytes = hex::decode(dir_name).ok()?;
    String::from_utf8(bytes).ok()
}

async fn write_atomic(path: &Path, contents: &[u8], store: &str) -> PrecacheResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)
        .await
        .map_err(|e| PrecacheError::storage(store, format!("writing {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| PrecacheError::storage(store, format!("renaming {}: {}", path.display(), e)))
}

struct DiskStore {
    name: String,
    dir: PathBuf,
}

impl DiskStore {
    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", entry_stem(key)))
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.body", entry_stem(key)))
    }
}

#[async_trait]
impl NamedStore for DiskStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, response: ResourceResponse) -> PrecacheResult<()> {
        let meta = EntryMeta {
            key: key.to_string(),
            status: response.status,
            headers: response.headers,
            cached_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;

        write_atomic(&self.body_path(key), &response.body, &self.name).await?;
        write_atomic(&self.meta_path(key), &meta_json, &self.name).await?;

        debug!("Stored {} in {} ({} bytes)", key, self.name, response.body.len());
        Ok(())
    }

    async fn match_key(&self, key: &str) -> PrecacheResult<Option<CachedEntry>> {
        let meta_path = self.meta_path(key);
        let content = match fs::read(&meta_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PrecacheError::storage(
                    &self.name,
                    format!("reading {}: {}", meta_path.display(), e),
                ))
            }
        };

        let meta: EntryMeta = serde_json::from_slice(&content)?;
        if meta.key != key {
            // Truncated-digest collision
            return Ok(None);
        }

        let body_path = self.body_path(key);
        let body = fs::read(&body_path).await.map_err(|e| {
            PrecacheError::storage(&self.name, format!("reading {}: {}", body_path.display(), e))
        })?;

        Ok(Some(CachedEntry {
            key: meta.key,
            response: ResourceResponse {
                status: meta.status,
                headers: meta.headers,
                body,
            },
            cached_at: meta.cached_at,
        }))
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(PrecacheError::io(format!("reading {}", self.dir.display()), e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading store entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = fs::read(&path).await.ok();
                match content.map(|c| serde_json::from_slice::<EntryMeta>(&c)) {
                    Some(Ok(meta)) => keys.push(meta.key),
                    _ => warn!("Skipping unreadable entry {}", path.display()),
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> PrecacheResult<Arc<dyn NamedStore>> {
        let dir = self.store_dir(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PrecacheError::io(format!("creating store {}", dir.display()), e))?;

        Ok(Arc::new(DiskStore {
            name: name.to_string(),
            dir,
        }))
    }

    async fn list(&self) -> PrecacheResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("reading storage root {}", self.root.display()),
                    e,
                ))
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading storage entry", e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Some(name) = entry.file_name().to_str().and_then(decode_store_name) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> PrecacheResult<bool> {
        let dir = self.store_dir(name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PrecacheError::storage(
                name,
                format!("removing {}: {}", dir.display(), e),
            )),
        }
    }

    fn backend_name(&self) -> &'static str {
        "disk"
    }
}
