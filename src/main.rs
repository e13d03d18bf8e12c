//! xcode_release - build, archive, export and upload Xcode projects.

use std::process;

use env_logger::Env;
use xcode_release::cli;
use xcode_release::cli::OutputManager;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    match cli::run() {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Never quiet for fatal errors
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
