//! `upload`: send an artifact to App Store Connect.

use std::path::Path;

use super::context::CommandContext;
use crate::error::Result;
use crate::platform::Platform;

/// Execute upload command
pub(super) fn execute_upload(ctx: &CommandContext, artifact: &Path, platform: Platform) -> Result<()> {
    ctx.load_env()?;
    ctx.runner().upload(&ctx.resolve_path(artifact), platform)
}
