//! `build`: clean and build for a simulator or the host Mac.

use super::context::CommandContext;
use crate::error::Result;
use crate::platform::Platform;

/// Execute build command
pub(super) fn execute_build(ctx: &mut CommandContext, platform: Platform, ci: bool) -> Result<()> {
    if ci {
        ctx.config.verbose_println("CI mode: skipping validation, code signing disabled");
    }
    let (runner, mut selector) = ctx.runner_with_selector();
    runner.build(&mut selector, platform, ci)
}
