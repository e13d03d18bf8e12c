//! `export`: turn an archive into an `.ipa` or `.pkg`.

use std::path::Path;

use super::context::CommandContext;
use crate::error::Result;
use crate::pipeline::ExportRequest;
use crate::platform::Platform;

/// Execute export command
pub(super) fn execute_export(
    ctx: &CommandContext,
    archive: &Path,
    export_options: Option<&Path>,
    destination: Option<&Path>,
    keep_archive: bool,
    platform: Option<Platform>,
) -> Result<()> {
    ctx.load_env()?;

    let request = ExportRequest {
        archive: ctx.resolve_path(archive),
        export_options: export_options.map(|p| ctx.resolve_path(p)),
        destination: destination.map(|p| ctx.resolve_path(p)),
        keep_archive,
        platform,
    };
    let export_dir = ctx.runner().export(&request)?;
    ctx.config
        .success_println(&format!("Export completed: {}", export_dir.display()));
    Ok(())
}
