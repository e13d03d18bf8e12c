//! `list`: show simulators and attached devices.

use super::context::CommandContext;
use crate::cli::list_device_classes;
use crate::error::Result;
use crate::platform::{DeviceClass, Platform};

/// Execute list command
pub(super) fn execute_list(
    ctx: &CommandContext,
    platform: Option<Platform>,
    simulators: bool,
    devices: bool,
) -> Result<()> {
    let platforms = match platform {
        Some(p) => vec![p],
        None => Platform::WITH_DEVICES.to_vec(),
    };
    let catalog = ctx.catalog();

    for platform in platforms {
        if !platform.has_devices() {
            ctx.config
                .println(&format!("{platform} runs on this Mac; there are no devices to list."));
            continue;
        }

        for class in list_device_classes(simulators, devices) {
            let heading = match class {
                DeviceClass::Simulator => format!("{platform} Simulators"),
                DeviceClass::Physical => format!("{platform} Devices"),
            };
            ctx.config.section(&heading);

            let found = catalog.list(platform, class);
            if found.is_empty() {
                ctx.config.indent("(none)");
            }
            for device in found {
                ctx.config.indent(&device.to_string());
            }
        }
    }

    Ok(())
}
