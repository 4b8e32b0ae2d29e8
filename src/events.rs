//! Lifecycle event log
//!
//! One JSON object per line in `events.log` under the state directory, one
//! line per install attempt and per activation outcome. Lines carry the
//! event kind in `event`, so the log can be read back with `EventLog::read`.

use crate::config::{schema::Config, StatePaths};
use crate::manifest::CacheVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Outcome of a lifecycle trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    #[serde(rename = "install.completed")]
    InstallCompleted {
        version: CacheVersion,
        assets: usize,
        attempts: u32,
    },

    #[serde(rename = "install.failed")]
    InstallFailed {
        version: CacheVersion,
        attempt: u32,
        /// Manifest paths that could not be cached, empty if none were reached
        failed_paths: Vec<String>,
        error: String,
    },

    #[serde(rename = "activate.completed")]
    ActivateCompleted {
        version: CacheVersion,
        deleted: Vec<String>,
    },

    #[serde(rename = "activate.cleanup_failed")]
    ActivateCleanupFailed {
        version: CacheVersion,
        deleted: Vec<String>,
        retained: Vec<String>,
    },
}

impl LifecycleEvent {
    /// Event kind as written to the `event` field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InstallCompleted { .. } => "install.completed",
            Self::InstallFailed { .. } => "install.failed",
            Self::ActivateCompleted { .. } => "activate.completed",
            Self::ActivateCleanupFailed { .. } => "activate.cleanup_failed",
        }
    }

    /// Generation the event concerns
    pub fn version(&self) -> &CacheVersion {
        match self {
            Self::InstallCompleted { version, .. }
            | Self::InstallFailed { version, .. }
            | Self::ActivateCompleted { version, .. }
            | Self::ActivateCleanupFailed { version, .. } => version,
        }
    }
}

/// A timestamped event as stored in the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LifecycleEvent,
}

/// Append-only lifecycle event log
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    /// Log under the state directory, or a disabled log if the config
    /// turns event logging off
    pub fn new(config: &Config, paths: &StatePaths) -> Self {
        Self {
            path: config
                .general
                .event_log
                .then(|| paths.event_log_path()),
        }
    }

    /// A log that records nothing
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Append `event`. Write failures are logged and dropped; the trigger
    /// being recorded has already happened.
    pub async fn record(&self, event: LifecycleEvent) {
        let Some(ref path) = self.path else {
            return;
        };

        let record = EventRecord {
            timestamp: Utc::now(),
            event,
        };
        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Could not encode {} event: {}", record.event.kind(), e);
                return;
            }
        };
        line.push('\n');

        let written = async {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        };

        match written.await {
            Ok(()) => debug!(
                "Recorded {} for {}",
                record.event.kind(),
                record.event.version()
            ),
            Err(e) => warn!("Could not append to {}: {}", path.display(), e),
        }
    }

    /// All readable records, oldest first. Lines that fail to parse are
    /// skipped; a missing or disabled log reads as empty.
    pub async fn read(&self) -> Vec<EventRecord> {
        let Some(ref path) = self.path else {
            return Vec::new();
        };

        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping malformed event line: {}", e);
                    None
                }
            })
            .collect()
    }
}
