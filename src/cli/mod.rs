//! Command line interface for xcode_release.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig, list_device_classes, run_device_class};
pub use commands::execute_command;
pub use output::OutputManager;

use clap::Parser;

use crate::error::Result;

/// Main CLI entry point; returns the process exit code.
///
/// Argument errors exit with 1 like every other failure; `--help` and
/// `--version` exit with 0.
pub fn run() -> Result<i32> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return Ok(code);
        }
    };
    execute_command(args)
}
