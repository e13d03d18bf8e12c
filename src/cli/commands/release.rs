//! `release`: archive, export and upload every platform.

use super::context::CommandContext;
use crate::error::Result;
use crate::pipeline::ReleaseOptions;
use crate::platform::Platform;

/// Execute release command
pub(super) fn execute_release(
    ctx: &CommandContext,
    show_in_organizer: bool,
    skip_export: bool,
    platform: Option<Platform>,
) -> Result<()> {
    ctx.load_env()?;

    let options = ReleaseOptions {
        platforms: platform.map_or_else(|| Platform::ALL.to_vec(), |p| vec![p]),
        show_in_organizer,
        skip_export,
    };

    let summary = ctx.runner().release(&options)?;
    for result in &summary.results {
        if let Some(stage) = result.failed_stage() {
            ctx.config
                .verbose_println(&format!("{}: failed at {stage}", result.platform));
        }
    }
    summary.into_result().map(|_| ())
}
