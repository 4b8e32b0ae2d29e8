//! Install progress with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for pre-caching a manifest.
///
/// Shows an indicatif bar in interactive mode, one line per asset in CI.
pub struct InstallProgress {
    bar: Option<ProgressBar>,
}

impl InstallProgress {
    pub fn new(ctx: &UiContext, version: &str, total: usize) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total as u64);
            let template = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Caching {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(template);
            bar.set_prefix(version.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Caching {} ({} assets)...", version, total);
            None
        };
        Self { bar }
    }

    /// Record one resolved asset
    pub fn on_asset(&self, path: &str, ok: bool) {
        match self.bar {
            Some(ref bar) => {
                bar.inc(1);
                bar.set_message(path.to_string());
            }
            None if ok => println!("  {} {}", style("[OK]").green(), path),
            None => println!("  {} {}", style("[FAIL]").red(), path),
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
