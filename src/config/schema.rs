//! Configuration schema for precache
//!
//! Configuration is stored at `~/.config/precache/config.toml`. The cache
//! version and asset manifest are compiled in and cannot be configured.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Origin the assets are fetched from
    pub origin: OriginConfig,

    /// Lifecycle driver policy
    pub lifecycle: LifecycleConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record lifecycle events to the event log
    pub event_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            event_log: true,
        }
    }
}

/// Origin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL manifest paths are resolved against
    pub base_url: String,

    /// Per-request timeout in seconds, 0 for none
    pub timeout_secs: u64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Lifecycle driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How many times the driver attempts an install before giving up
    pub install_attempts: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            install_attempts: 1,
        }
    }
}
