//! `archive`: clean and archive in the Release configuration.

use std::path::Path;

use super::context::CommandContext;
use crate::error::Result;
use crate::pipeline::ArchiveOptions;
use crate::platform::Platform;

/// Execute archive command
pub(super) fn execute_archive(
    ctx: &CommandContext,
    platform: Platform,
    destination: &Path,
    show_in_organizer: bool,
    ci: bool,
) -> Result<()> {
    let options = ArchiveOptions {
        destination: ctx.resolve_path(destination),
        show_in_organizer,
        ci_mode: ci,
    };
    let archive = ctx.runner().archive(platform, &options)?;
    ctx.config
        .success_println(&format!("Archive created: {}", archive.display()));
    Ok(())
}
