//! Status command - show generations and the active store

use super::open_driver;
use crate::config::{Config, StatePaths};
use crate::error::PrecacheResult;
use crate::lifecycle::GenerationState;
use crate::manifest::CacheVersion;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the status command
pub async fn execute(config: &Config, paths: &StatePaths) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let driver = open_driver(config, paths).await?;
    let current = CacheVersion::current();

    println!("{}", style("Precache Status").bold().cyan());

    ui::section(&ctx, "Cache");
    ui::key_value(&ctx, "Current version", current.as_str());
    match driver.manager().active_version().await {
        Some(active) => ui::key_value_status(&ctx, "Serving", active.as_str(), active == current),
        None => ui::key_value_status(&ctx, "Serving", "nothing (network only)", false),
    }
    ui::key_value(&ctx, "Storage", driver.manager().storage().backend_name());
    ui::key_value(&ctx, "Origin", &driver.manager().transport().describe());
    ui::key_value(&ctx, "State dir", &paths.root().display().to_string());

    if let Some(last) = driver.events().await.pop() {
        ui::key_value(
            &ctx,
            "Last event",
            &format!(
                "{} {} ({})",
                last.event.kind(),
                last.event.version(),
                last.timestamp.format("%Y-%m-%d %H:%M")
            ),
        );
    }

    let generations = driver.generations().await;
    ui::section(&ctx, "Generations");
    if generations.is_empty() {
        ui::step_warn_hint(&ctx, "No generations installed", "Run: precache install");
        return Ok(());
    }

    println!(
        "  {:<28} {:<12} {:<8} {:<17}",
        style("VERSION").bold(),
        style("STATE").bold(),
        style("ASSETS").bold(),
        style("UPDATED").bold()
    );
    println!("  {}", "-".repeat(65));

    for generation in &generations {
        let state = match generation.state {
            GenerationState::Active => style(generation.state.to_string()).green(),
            GenerationState::Installed => style(generation.state.to_string()).cyan(),
            GenerationState::Installing | GenerationState::Activating => {
                style(generation.state.to_string()).yellow()
            }
            GenerationState::Uninstalled | GenerationState::Deleted => {
                style(generation.state.to_string()).dim()
            }
        };
        let updated = generation.updated_at.format("%Y-%m-%d %H:%M").to_string();
        println!(
            "  {:<28} {:<12} {:<8} {:<17}",
            generation.version.as_str(),
            state,
            generation.asset_count,
            updated
        );
    }

    Ok(())
}
