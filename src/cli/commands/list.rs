//! List command - show cache stores

use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::StatePaths;
use crate::error::PrecacheResult;
use crate::manifest::CacheVersion;
use crate::storage::{CacheStorage, DiskStorage, NamedStore};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StoreSummary {
    name: String,
    entries: usize,
    current: bool,
}

/// Execute the list command
pub async fn execute(args: ListArgs, paths: &StatePaths) -> PrecacheResult<()> {
    let storage = DiskStorage::new(paths.caches_dir());
    let current = CacheVersion::current();

    let mut stores = Vec::new();
    for name in storage.list().await? {
        let entries = storage.open(&name).await?.keys().await?.len();
        stores.push(StoreSummary {
            current: name == current.as_str(),
            name,
            entries,
        });
    }

    if stores.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No cache stores");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&stores),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stores)?),
        OutputFormat::Plain => {
            for store in &stores {
                println!("{}", store.name);
            }
        }
    }

    Ok(())
}

fn print_table(stores: &[StoreSummary]) {
    let ctx = UiContext::detect();
    ui::section(&ctx, "Cache stores");

    println!(
        "{:<32} {:<10} {:<10}",
        style("NAME").bold(),
        style("ENTRIES").bold(),
        style("VERSION").bold()
    );
    println!("{}", "-".repeat(52));

    for store in stores {
        let version = if store.current {
            style("current").green()
        } else {
            style("stale").dim()
        };
        println!("{:<32} {:<10} {:<10}", store.name, store.entries, version);
    }

    println!();
    println!("{} store(s)", stores.len());
}
