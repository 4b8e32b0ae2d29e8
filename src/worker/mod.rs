//! Offline cache worker
//!
//! Holds the cache lifecycle itself. Storage and transport are injected, so
//! the same manager runs against the on-disk store in the CLI and against
//! `MemoryStorage` in tests.

mod manager;

pub use manager::{ActivationReport, AssetProgress, InstallReport, OfflineCacheManager};
