//! Error types for precache
//!
//! All modules use `PrecacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for precache operations
pub type PrecacheResult<T> = Result<T, PrecacheError>;

/// A single asset that could not be fetched or stored during install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    /// Manifest path of the asset
    pub path: String,
    /// Why it failed
    pub reason: String,
}

/// A stale store whose deletion failed during activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    /// Name of the store that survived
    pub store: String,
    /// Why deletion failed
    pub reason: String,
}

/// All errors that can occur in precache
#[derive(Error, Debug)]
pub enum PrecacheError {
    // Lifecycle errors
    #[error(
        "Install of {version} failed: {} of {total} assets could not be cached (first: {})",
        .failures.len(),
        first_asset_failure(.failures)
    )]
    InstallFailed {
        version: String,
        total: usize,
        failures: Vec<AssetFailure>,
    },

    #[error(
        "Activation of {version} could not remove {} stale store(s): {}",
        .failures.len(),
        store_names(.failures)
    )]
    ActivationCleanupFailed {
        version: String,
        deleted: Vec<String>,
        failures: Vec<CleanupFailure>,
    },

    #[error("Resource unavailable: {path} is not cached and the network request failed: {reason}")]
    ResourceUnavailable { path: String, reason: String },

    #[error("Cannot {operation} generation {version} while it is {state}")]
    LifecycleOrder {
        operation: &'static str,
        version: String,
        state: String,
    },

    #[error("Generation not installed: {0}")]
    GenerationNotFound(String),

    #[error("Invalid asset manifest: {0}")]
    ManifestInvalid(String),

    // Storage errors
    #[error("Storage error in {store}: {reason}")]
    Storage { store: String, reason: String },

    #[error("Storage quota exceeded in {store} while writing {key}")]
    StorageQuota { store: String, key: String },

    // Network errors
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn first_asset_failure(failures: &[AssetFailure]) -> String {
    failures
        .first()
        .map(|f| format!("{}: {}", f.path, f.reason))
        .unwrap_or_default()
}

fn store_names(failures: &[CleanupFailure]) -> String {
    failures
        .iter()
        .map(|f| f.store.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PrecacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a storage error for a named store
    pub fn storage(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Check if the lifecycle driver may retry the triggering operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InstallFailed { .. }
                | Self::ActivationCleanupFailed { .. }
                | Self::ResourceUnavailable { .. }
                | Self::Network { .. }
        )
    }

    /// Whether the error stops the lifecycle transition it was raised in
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ActivationCleanupFailed { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InstallFailed { .. } => {
                Some("Check that the origin serves every manifest path, then run: precache install")
            }
            Self::ActivationCleanupFailed { .. } => {
                Some("Stale stores are retried on the next run of: precache activate")
            }
            Self::ResourceUnavailable { .. } => {
                Some("The path was never pre-cached and the origin is unreachable")
            }
            Self::GenerationNotFound(_) => Some("Run: precache install"),
            Self::LifecycleOrder { .. } => Some("Run: precache status"),
            _ => None,
        }
    }
}
