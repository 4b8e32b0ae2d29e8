//! Manifest command - print the compiled-in version and assets

use crate::error::PrecacheResult;
use crate::manifest::{AssetManifest, CacheVersion};
use console::style;

/// Execute the manifest command
pub async fn execute() -> PrecacheResult<()> {
    let manifest = AssetManifest::builtin();

    println!("{} {}", style("Version:").bold(), CacheVersion::current());
    println!("{} ({})", style("Assets:").bold(), manifest.len());
    for path in manifest.paths() {
        println!("  {}", path);
    }

    Ok(())
}
