//! Lifecycle driver
//!
//! Delivers install, activate and fetch triggers to the cache manager and
//! enforces their ordering per generation: a generation must be installed
//! before it can be activated, and only serves once activation completes.
//! Lifecycle triggers are serialized through the registry lock; fetches are
//! not and may run concurrently.

use crate::config::{Config, StatePaths};
use crate::error::{PrecacheError, PrecacheResult};
use crate::events::{EventLog, LifecycleEvent};
use crate::lifecycle::state::{Generation, GenerationState, Registry};
use crate::manifest::{AssetManifest, CacheVersion};
use crate::resource::{ResourceRequest, Served};
use crate::worker::{ActivationReport, AssetProgress, InstallReport, OfflineCacheManager};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Host-side driver owning the manager and the generation registry
pub struct LifecycleDriver {
    manager: OfflineCacheManager,
    registry: Mutex<Registry>,
    registry_path: Option<PathBuf>,
    events: EventLog,
    install_attempts: u32,
}

impl LifecycleDriver {
    /// Create a driver with an in-memory registry and a single install attempt
    pub fn new(manager: OfflineCacheManager) -> Self {
        Self {
            manager,
            registry: Mutex::new(Registry::default()),
            registry_path: None,
            events: EventLog::disabled(),
            install_attempts: 1,
        }
    }

    /// Open a driver backed by the registry and event log under `paths`.
    ///
    /// If a generation was active when the registry was last saved, the
    /// manager is rebound to it.
    pub async fn open(
        manager: OfflineCacheManager,
        config: &Config,
        paths: &StatePaths,
    ) -> PrecacheResult<Self> {
        let registry_path = paths.registry_path();
        let registry = Registry::load(&registry_path).await?;

        let driver = Self {
            manager,
            registry: Mutex::new(registry),
            registry_path: Some(registry_path),
            events: EventLog::new(config, paths),
            install_attempts: config.lifecycle.install_attempts,
        };
        driver.resume().await?;
        Ok(driver)
    }

    /// Set how many times an install is attempted before failing
    pub fn with_install_attempts(mut self, attempts: u32) -> Self {
        self.install_attempts = attempts.max(1);
        self
    }

    pub fn manager(&self) -> &OfflineCacheManager {
        &self.manager
    }

    /// Rebind the manager to the registry's active generation, if any.
    ///
    /// Returns the version that is serving. If the active generation's store
    /// is gone from storage nothing is bound and `None` is returned.
    pub async fn resume(&self) -> PrecacheResult<Option<CacheVersion>> {
        let active = self.registry.lock().await.active().map(|g| g.version.clone());
        match active {
            Some(version) => Ok(self.manager.resume(&version).await?.then_some(version)),
            None => Ok(None),
        }
    }

    /// Lifecycle events recorded so far, oldest first
    pub async fn events(&self) -> Vec<crate::events::EventRecord> {
        self.events.read().await
    }

    /// Snapshot of all generations, newest first
    pub async fn generations(&self) -> Vec<Generation> {
        self.registry.lock().await.all()
    }

    /// State of one generation, `None` if never seen
    pub async fn state_of(&self, version: &CacheVersion) -> Option<GenerationState> {
        self.registry.lock().await.get(version).map(|g| g.state)
    }

    async fn persist(&self, registry: &Registry) -> PrecacheResult<()> {
        if let Some(ref path) = self.registry_path {
            registry.save(path).await?;
        }
        Ok(())
    }

    /// Deliver the install trigger for `version`
    pub async fn install(
        &self,
        manifest: &AssetManifest,
        version: &CacheVersion,
    ) -> PrecacheResult<InstallReport> {
        self.install_with_progress(manifest, version, &|_| {}).await
    }

    /// Deliver the install trigger, reporting per-asset progress
    pub async fn install_with_progress(
        &self,
        manifest: &AssetManifest,
        version: &CacheVersion,
        on_asset: &(dyn Fn(AssetProgress<'_>) + Send + Sync),
    ) -> PrecacheResult<InstallReport> {
        let mut registry = self.registry.lock().await;

        let generation = registry.entry(version);
        if !generation.state.can_install() {
            return Err(PrecacheError::LifecycleOrder {
                operation: "install",
                version: version.to_string(),
                state: generation.state.to_string(),
            });
        }
        generation.transition(GenerationState::Installing);
        self.persist(&registry).await?;

        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            match self
                .manager
                .on_install_with_progress(manifest, version, on_asset)
                .await
            {
                Ok(report) => break Ok(report),
                Err(e) => {
                    let failed_paths = match e {
                        PrecacheError::InstallFailed { ref failures, .. } => {
                            failures.iter().map(|f| f.path.clone()).collect()
                        }
                        _ => Vec::new(),
                    };
                    self.events
                        .record(LifecycleEvent::InstallFailed {
                            version: version.clone(),
                            attempt,
                            failed_paths,
                            error: e.to_string(),
                        })
                        .await;

                    if attempt < self.install_attempts && e.is_retryable() {
                        warn!(
                            "Install attempt {}/{} for {} failed, retrying: {}",
                            attempt, self.install_attempts, version, e
                        );
                        continue;
                    }
                    break Err(e);
                }
            }
        };

        let generation = registry.entry(version);
        match result {
            Ok(report) => {
                generation.asset_count = report.stored;
                generation.transition(GenerationState::Installed);
                self.persist(&registry).await?;

                self.events
                    .record(LifecycleEvent::InstallCompleted {
                        version: version.clone(),
                        assets: report.stored,
                        attempts: attempt,
                    })
                    .await;
                info!("Generation {} installed", version);
                Ok(report)
            }
            Err(e) => {
                generation.transition(GenerationState::Uninstalled);
                self.persist(&registry).await?;
                Err(e)
            }
        }
    }

    /// Deliver the activate trigger for `version`.
    ///
    /// A cleanup failure does not stop the transition: the generation becomes
    /// active and the surviving stores are listed in `retained`.
    pub async fn activate(&self, version: &CacheVersion) -> PrecacheResult<ActivationReport> {
        let mut registry = self.registry.lock().await;

        let previous = match registry.get(version) {
            Some(g) if g.state.can_activate() => g.state,
            Some(g) => {
                return Err(PrecacheError::LifecycleOrder {
                    operation: "activate",
                    version: version.to_string(),
                    state: g.state.to_string(),
                })
            }
            None => return Err(PrecacheError::GenerationNotFound(version.to_string())),
        };

        registry.entry(version).transition(GenerationState::Activating);
        self.persist(&registry).await?;

        let report = match self.manager.on_activate(version).await {
            Ok(report) => report,
            Err(PrecacheError::ActivationCleanupFailed {
                deleted, failures, ..
            }) => {
                warn!(
                    "{} stale store(s) survived activation of {}; retrying next activation",
                    failures.len(),
                    version
                );
                ActivationReport {
                    version: version.clone(),
                    deleted,
                    retained: failures,
                }
            }
            Err(e) => {
                registry.entry(version).transition(previous);
                self.persist(&registry).await?;
                return Err(e);
            }
        };

        registry.supersede(version, &report.deleted);
        registry.entry(version).transition(GenerationState::Active);
        self.persist(&registry).await?;

        let event = if report.is_clean() {
            LifecycleEvent::ActivateCompleted {
                version: version.clone(),
                deleted: report.deleted.clone(),
            }
        } else {
            LifecycleEvent::ActivateCleanupFailed {
                version: version.clone(),
                deleted: report.deleted.clone(),
                retained: report.retained.iter().map(|f| f.store.clone()).collect(),
            }
        };
        self.events.record(event).await;

        info!("Generation {} active", version);
        Ok(report)
    }

    /// Deliver a fetch-intercept
    pub async fn fetch(&self, request: &ResourceRequest) -> PrecacheResult<Served> {
        debug!("Intercepted {}", request);
        self.manager.on_fetch(request).await
    }
}
