//! UI module for consistent CLI output
//!
//! Plain `[OK]`/`[FAIL]` lines in CI and pipes, colors and an indicatif
//! progress bar in an interactive terminal.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    key_value, key_value_status, section, step_error_detail, step_info, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::InstallProgress;
