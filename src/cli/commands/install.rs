//! Install command - pre-cache the asset manifest

use super::open_driver;
use crate::config::{Config, StatePaths};
use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::{AssetManifest, CacheVersion};
use crate::ui::{self, InstallProgress, UiContext};
use crate::worker::AssetProgress;

/// Execute the install command
pub async fn execute(config: &Config, paths: &StatePaths) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let driver = open_driver(config, paths).await?;
    let manifest = AssetManifest::builtin();
    let version = CacheVersion::current();

    let progress = InstallProgress::new(&ctx, version.as_str(), manifest.len());
    let result = driver
        .install_with_progress(&manifest, &version, &|event| match event {
            AssetProgress::Stored(path) => progress.on_asset(path, true),
            AssetProgress::Failed(path) => progress.on_asset(path, false),
        })
        .await;
    progress.finish();

    match result {
        Ok(report) => {
            ui::step_ok_detail(
                &ctx,
                &format!("Installed {}", report.version),
                &format!("{} assets from {}", report.stored, config.origin.base_url),
            );
            ui::step_info(&ctx, "Run: precache activate");
            Ok(())
        }
        Err(e) => {
            if let PrecacheError::InstallFailed { ref failures, .. } = e {
                for failure in failures {
                    ui::step_error_detail(&ctx, &failure.path, &failure.reason);
                }
            }
            Err(e)
        }
    }
}
