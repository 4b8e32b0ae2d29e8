//! CLI command implementations

pub mod activate;
pub mod config;
pub mod fetch;
pub mod install;
pub mod list;
pub mod manifest;
pub mod status;

pub use activate::execute as activate;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use list::execute as list;
pub use manifest::execute as manifest;
pub use status::execute as status;

use crate::config::{Config, StatePaths};
use crate::error::PrecacheResult;
use crate::lifecycle::LifecycleDriver;
use crate::network::HttpTransport;
use crate::storage::DiskStorage;
use crate::worker::OfflineCacheManager;
use std::sync::Arc;

/// Build a driver over the on-disk stores and the configured origin
pub(crate) async fn open_driver(
    config: &Config,
    paths: &StatePaths,
) -> PrecacheResult<LifecycleDriver> {
    paths.ensure().await?;

    let storage = Arc::new(DiskStorage::new(paths.caches_dir()));
    let transport = Arc::new(HttpTransport::new(&config.origin));
    let manager = OfflineCacheManager::new(storage, transport);

    LifecycleDriver::open(manager, config, paths).await
}
