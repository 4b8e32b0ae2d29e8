//! Activate command - make the current version serve and prune the rest

use super::open_driver;
use crate::config::{Config, StatePaths};
use crate::error::PrecacheResult;
use crate::manifest::CacheVersion;
use crate::ui::{self, UiContext};

/// Execute the activate command
pub async fn execute(config: &Config, paths: &StatePaths) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let driver = open_driver(config, paths).await?;
    let version = CacheVersion::current();

    let report = driver.activate(&version).await?;

    for name in &report.deleted {
        ui::step_info(&ctx, &format!("Deleted stale store {}", name));
    }
    for failure in &report.retained {
        ui::step_warn_hint(
            &ctx,
            &format!("Could not delete {}: {}", failure.store, failure.reason),
            "it will be retried on the next activation",
        );
    }

    ui::step_ok(&ctx, &format!("{} is active", report.version));
    Ok(())
}
