//! Generation state persistence

use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::CacheVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tokio::fs;

/// Lifecycle state of one cache generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
    Deleted,
}

impl GenerationState {
    /// Whether an install may start from this state
    pub fn can_install(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Whether an activation may start from this state.
    ///
    /// `Activating` is allowed so an interrupted activation can be finished,
    /// `Active` so stale stores left by a failed cleanup can be retried.
    pub fn can_activate(&self) -> bool {
        matches!(self, Self::Installed | Self::Activating | Self::Active)
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninstalled => "uninstalled",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Generation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub version: CacheVersion,

    pub state: GenerationState,

    /// Assets written by the last successful install
    pub asset_count: usize,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub installed_at: Option<DateTime<Utc>>,

    pub activated_at: Option<DateTime<Utc>>,
}

impl Generation {
    /// Create a new, uninstalled generation
    pub fn new(version: CacheVersion) -> Self {
        let now = Utc::now();
        Self {
            version,
            state: GenerationState::Uninstalled,
            asset_count: 0,
            created_at: now,
            updated_at: now,
            installed_at: None,
            activated_at: None,
        }
    }

    /// Move to `state`, stamping the transition time
    pub fn transition(&mut self, state: GenerationState) {
        let now = Utc::now();
        match state {
            GenerationState::Installed => self.installed_at = Some(now),
            GenerationState::Active => self.activated_at = Some(now),
            _ => {}
        }
        self.state = state;
        self.updated_at = now;
    }
}

/// All known generations, keyed by version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    generations: BTreeMap<CacheVersion, Generation>,
}

impl Registry {
    /// Load the registry from file, empty if the file does not exist
    pub async fn load(path: &Path) -> PrecacheResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PrecacheError::io(format!("reading registry {}", path.display()), e))?;

        Ok(serde_json::from_str(&content)?)
    }

    /// Save the registry to file
    pub async fn save(&self, path: &Path) -> PrecacheResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PrecacheError::io("creating state directory", e))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .await
            .map_err(|e| PrecacheError::io(format!("writing registry {}", path.display()), e))?;

        Ok(())
    }

    pub fn get(&self, version: &CacheVersion) -> Option<&Generation> {
        self.generations.get(version)
    }

    /// Get a generation, registering it as uninstalled if unknown
    pub fn entry(&mut self, version: &CacheVersion) -> &mut Generation {
        self.generations
            .entry(version.clone())
            .or_insert_with(|| Generation::new(version.clone()))
    }

    /// The generation currently in the `Active` state
    pub fn active(&self) -> Option<&Generation> {
        self.generations
            .values()
            .find(|g| g.state == GenerationState::Active)
    }

    /// All generations, newest first
    pub fn all(&self) -> Vec<Generation> {
        let mut all: Vec<Generation> = self.generations.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Retire every generation other than `current`.
    ///
    /// Generations whose stores were removed become deleted. One that was
    /// serving but whose store survived drops back to installed, so only
    /// `current` is ever active. Names without a registry entry are ignored.
    pub fn supersede(&mut self, current: &CacheVersion, removed_stores: &[String]) {
        for generation in self.generations.values_mut() {
            if &generation.version == current {
                continue;
            }
            let removed = removed_stores
                .iter()
                .any(|name| name == generation.version.as_str());
            match generation.state {
                GenerationState::Deleted => {}
                _ if removed => generation.transition(GenerationState::Deleted),
                GenerationState::Active | GenerationState::Activating => {
                    generation.transition(GenerationState::Installed)
                }
                _ => {}
            }
        }
    }
}
