//! `run`: build and launch for local development.

use super::context::CommandContext;
use crate::cli::run_device_class;
use crate::error::Result;
use crate::pipeline::RunRequest;
use crate::platform::Platform;

/// Execute run command
pub(super) fn execute_run(
    ctx: &mut CommandContext,
    platform: Platform,
    device: bool,
    target: Option<&str>,
    select: bool,
) -> Result<()> {
    let request = RunRequest {
        platform,
        class: run_device_class(device),
        target,
        force_select: select,
    };
    let (runner, mut selector) = ctx.runner_with_selector();
    runner.run(&mut selector, &request)
}
