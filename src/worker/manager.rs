//! Offline cache manager
//!
//! Mediates requests through a versioned named cache. The three entry points
//! map to the host's lifecycle triggers:
//!
//! - `on_install` pre-caches every manifest asset into the generation's store
//! - `on_activate` prunes every other store and binds the active handle
//! - `on_fetch` serves cache-first, falling back to the network

use crate::error::{AssetFailure, CleanupFailure, PrecacheError, PrecacheResult};
use crate::manifest::{AssetManifest, CacheVersion};
use crate::network::Transport;
use crate::resource::{ResourceRequest, ResponseSource, Served};
use crate::storage::{CacheStorage, NamedStore};
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Outcome of a successful install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub version: CacheVersion,
    /// Number of assets written
    pub stored: usize,
}

/// Outcome of an activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub version: CacheVersion,
    /// Stale stores removed by this activation
    pub deleted: Vec<String>,
    /// Stale stores that survived and will be retried next activation
    pub retained: Vec<CleanupFailure>,
}

impl ActivationReport {
    /// Whether every stale store is gone
    pub fn is_clean(&self) -> bool {
        self.retained.is_empty()
    }
}

/// Per-asset install progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetProgress<'a> {
    Stored(&'a str),
    Failed(&'a str),
}

/// The store currently serving fetch-intercepts
#[derive(Clone)]
struct ActiveStore {
    version: CacheVersion,
    store: Arc<dyn NamedStore>,
}

/// Cache-first request mediator over injected storage and transport
pub struct OfflineCacheManager {
    storage: Arc<dyn CacheStorage>,
    transport: Arc<dyn Transport>,
    active: RwLock<Option<ActiveStore>>,
}

impl OfflineCacheManager {
    /// Create a manager with no active generation
    pub fn new(storage: Arc<dyn CacheStorage>, transport: Arc<dyn Transport>) -> Self {
        Self {
            storage,
            transport,
            active: RwLock::new(None),
        }
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Version of the generation currently serving, if any
    pub async fn active_version(&self) -> Option<CacheVersion> {
        self.active.read().await.as_ref().map(|a| a.version.clone())
    }

    /// Pre-cache every manifest asset into the store for `version`
    pub async fn on_install(
        &self,
        manifest: &AssetManifest,
        version: &CacheVersion,
    ) -> PrecacheResult<InstallReport> {
        self.on_install_with_progress(manifest, version, &|_| {})
            .await
    }

    /// `on_install`, reporting each asset as it resolves.
    ///
    /// Assets are fetched concurrently. Every fetch runs to completion even
    /// after one fails; entries already written stay in the store.
    pub async fn on_install_with_progress(
        &self,
        manifest: &AssetManifest,
        version: &CacheVersion,
        on_asset: &(dyn Fn(AssetProgress<'_>) + Send + Sync),
    ) -> PrecacheResult<InstallReport> {
        info!("Installing {} ({} assets)", version, manifest.len());

        let store = match self.storage.open(version.as_str()).await {
            Ok(store) => store,
            Err(e) => {
                let reason = e.to_string();
                return Err(PrecacheError::InstallFailed {
                    version: version.to_string(),
                    total: manifest.len(),
                    failures: manifest
                        .paths()
                        .iter()
                        .map(|path| AssetFailure {
                            path: path.clone(),
                            reason: reason.clone(),
                        })
                        .collect(),
                });
            }
        };

        let tasks = manifest.paths().iter().map(|path| {
            let store = Arc::clone(&store);
            async move {
                let result = self.cache_asset(store.as_ref(), path).await;
                match &result {
                    Ok(()) => on_asset(AssetProgress::Stored(path)),
                    Err(e) => {
                        warn!("Failed to cache {}: {}", path, e);
                        on_asset(AssetProgress::Failed(path));
                    }
                }
                (path, result)
            }
        });

        let failures: Vec<AssetFailure> = join_all(tasks)
            .await
            .into_iter()
            .filter_map(|(path, result)| {
                result.err().map(|e| AssetFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            })
            .collect();

        if !failures.is_empty() {
            return Err(PrecacheError::InstallFailed {
                version: version.to_string(),
                total: manifest.len(),
                failures,
            });
        }

        info!("Installed {}", version);
        Ok(InstallReport {
            version: version.clone(),
            stored: manifest.len(),
        })
    }

    /// Fetch one asset and write it under its path
    async fn cache_asset(&self, store: &dyn NamedStore, path: &str) -> PrecacheResult<()> {
        let request = ResourceRequest::get(path);
        let response = self.transport.fetch(&request).await?;

        if !response.is_success() {
            return Err(PrecacheError::network(
                path,
                format!("unexpected status {}", response.status),
            ));
        }

        store.put(path, response).await?;
        debug!("Cached {} in {}", path, store.name());
        Ok(())
    }

    /// Delete every store except `current` and bind `current` as active.
    ///
    /// Deletions run concurrently. A store that is already gone counts as
    /// deleted. If any deletion fails the handle is still bound and
    /// `ActivationCleanupFailed` is returned; the surviving stores are
    /// picked up again by the next activation.
    pub async fn on_activate(&self, current: &CacheVersion) -> PrecacheResult<ActivationReport> {
        info!("Activating {}", current);

        let mut retained = Vec::new();
        let names = match self.storage.list().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Could not list stores, skipping cleanup: {}", e);
                retained.push(CleanupFailure {
                    store: "*".to_string(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        };

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| name != current.as_str())
            .collect();

        let results = join_all(stale.iter().map(|name| async move {
            (name, self.storage.delete(name).await)
        }))
        .await;

        let mut deleted = Vec::new();
        for (name, result) in results {
            match result {
                Ok(true) => {
                    info!("Deleted stale store {}", name);
                    deleted.push(name.clone());
                }
                Ok(false) => {
                    debug!("Stale store {} already gone", name);
                    deleted.push(name.clone());
                }
                Err(e) => {
                    warn!("Failed to delete stale store {}: {}", name, e);
                    retained.push(CleanupFailure {
                        store: name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.bind(current).await?;

        if !retained.is_empty() {
            return Err(PrecacheError::ActivationCleanupFailed {
                version: current.to_string(),
                deleted,
                failures: retained,
            });
        }

        Ok(ActivationReport {
            version: current.clone(),
            deleted,
            retained,
        })
    }

    /// Rebind a generation that was already active, without pruning.
    ///
    /// Returns `false` and leaves nothing bound if the generation's store no
    /// longer exists; it is not recreated.
    pub async fn resume(&self, version: &CacheVersion) -> PrecacheResult<bool> {
        if !self.storage.has(version.as_str()).await? {
            warn!(
                "Store for active generation {} is missing; serving from the network until it is reinstalled",
                version
            );
            return Ok(false);
        }

        debug!("Resuming active generation {}", version);
        self.bind(version).await?;
        Ok(true)
    }

    async fn bind(&self, version: &CacheVersion) -> PrecacheResult<()> {
        let store = self.storage.open(version.as_str()).await?;
        *self.active.write().await = Some(ActiveStore {
            version: version.clone(),
            store,
        });
        info!("{} is now serving", version);
        Ok(())
    }

    /// Serve a request cache-first.
    ///
    /// Never writes to any store. A lookup error is treated as a miss.
    pub async fn on_fetch(&self, request: &ResourceRequest) -> PrecacheResult<Served> {
        if let Some(key) = request.cache_key() {
            let active = self.active.read().await.clone();
            if let Some(active) = active {
                match active.store.match_key(key).await {
                    Ok(Some(entry)) => {
                        debug!("Cache hit for {} in {}", key, active.version);
                        return Ok(Served {
                            source: ResponseSource::Cache,
                            response: entry.response,
                        });
                    }
                    Ok(None) => debug!("Cache miss for {}", key),
                    Err(e) => warn!("Cache lookup for {} failed, using network: {}", key, e),
                }
            }
        }

        match self.transport.fetch(request).await {
            Ok(response) => Ok(Served {
                source: ResponseSource::Network,
                response,
            }),
            Err(e) => Err(PrecacheError::ResourceUnavailable {
                path: request.path.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
