//! Command execution: resolve the project, run one command, map the outcome
//! to an exit code.

mod archive;
mod build;
mod context;
mod export;
mod list;
mod release;
mod run;
mod upload;

use clap::CommandFactory;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{ReleaseError, Result};

use archive::execute_archive;
use build::execute_build;
use context::CommandContext;
use export::execute_export;
use list::execute_list;
use release::execute_release;
use run::execute_run;
use upload::execute_upload;

/// Execute the command in `args` and return the exit code
pub fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from(&args);

    let Some(command) = args.command.clone() else {
        let _ = Args::command().print_help();
        return Ok(1);
    };

    let result = CommandContext::from_args(&args, config.clone())
        .and_then(|mut ctx| dispatch(&mut ctx, &command));

    match result {
        Ok(()) => Ok(0),
        Err(e) => {
            report_failure(&config, command.name(), &e);
            Ok(1)
        }
    }
}

fn dispatch(ctx: &mut CommandContext, command: &Command) -> Result<()> {
    match command {
        Command::Build { platform, ci } => execute_build(ctx, *platform, *ci),
        Command::Archive {
            platform,
            destination,
            show_in_organizer,
            ci,
        } => execute_archive(ctx, *platform, destination, *show_in_organizer, *ci),
        Command::Export {
            archive_path,
            export_options,
            destination,
            keep_archive,
            platform,
        } => execute_export(
            ctx,
            archive_path,
            export_options.as_deref(),
            destination.as_deref(),
            *keep_archive,
            *platform,
        ),
        Command::Upload {
            artifact_path,
            platform,
        } => execute_upload(ctx, artifact_path, *platform),
        Command::Release {
            show_in_organizer,
            skip_export,
            platform,
        } => execute_release(ctx, *show_in_organizer, *skip_export, *platform),
        Command::Run {
            platform,
            simulator: _,
            device,
            target,
            select,
        } => execute_run(ctx, *platform, *device, target.as_deref(), *select),
        Command::List {
            platform,
            simulators,
            devices,
        } => execute_list(ctx, *platform, *simulators, *devices),
    }
}

fn report_failure(config: &RuntimeConfig, name: &str, error: &ReleaseError) {
    config.error_println(&format!("Command '{name}' failed: {error}"));

    if config.is_verbose() {
        if error.is_pre_stage() {
            config.verbose_println("No Xcode tools were run.");
        }
        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            config.println("\n💡 Recovery suggestions:");
            for suggestion in suggestions {
                config.println(&format!("  • {suggestion}"));
            }
        }
    }
}
