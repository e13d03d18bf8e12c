//! Target platforms and their per-platform lookup tables.
//!
//! Every place that needs to know something platform specific (where to
//! archive for, which upload type to pass, what the exported artifact is
//! called) asks [`Platform`] instead of comparing strings.

use std::fmt;
use std::str::FromStr;

use crate::error::CliError;

/// Apple platform a scheme is built for.
///
/// Parsed from the command line through [`FromStr`], so `iOS`, `OSX` and
/// `AppleTVOS` are all accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    /// iPhone and iPad.
    Ios,

    /// The host Mac.
    Macos,

    /// Apple TV.
    Tvos,
}

/// Which kind of target a device identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// A CoreSimulator device
    Simulator,
    /// Real hardware attached to this Mac
    Physical,
}

impl Platform {
    /// All platforms, in release order.
    pub const ALL: [Platform; 3] = [Platform::Ios, Platform::Macos, Platform::Tvos];

    /// Platforms that have simulators and attachable devices.
    pub const WITH_DEVICES: [Platform; 2] = [Platform::Ios, Platform::Tvos];

    /// Lowercase key used in preference keys and file names.
    pub fn key(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Macos => "macos",
            Platform::Tvos => "tvos",
        }
    }

    /// Human-readable label, also used in canonical artifact names.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Ios => "iOS",
            Platform::Macos => "macOS",
            Platform::Tvos => "tvOS",
        }
    }

    /// `-destination` value used when archiving.
    pub fn archive_destination(&self) -> &'static str {
        match self {
            Platform::Ios => "generic/platform=iOS",
            Platform::Macos => "platform=macOS",
            Platform::Tvos => "generic/platform=tvOS",
        }
    }

    /// `-t` value passed to altool.
    pub fn upload_type(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Macos => "macos",
            Platform::Tvos => "appletvos",
        }
    }

    /// Extension of the artifact produced by an export.
    pub fn artifact_extension(&self) -> &'static str {
        match self {
            Platform::Ios | Platform::Tvos => "ipa",
            Platform::Macos => "pkg",
        }
    }

    /// File name of the per-platform export options plist used by `release`.
    pub fn export_options_file(&self) -> String {
        format!("exportOptions.{}.plist", self.key())
    }

    /// Archive bundle name without timestamp, e.g. `KMReader-iOS`.
    pub fn archive_stem(&self, scheme: &str) -> String {
        format!("{}-{}", scheme, self.display_name())
    }

    /// Whether the platform has simulators and physical devices to pick from.
    pub fn has_devices(&self) -> bool {
        !matches!(self, Platform::Macos)
    }

    /// CoreSimulator runtime identifier prefix for this platform.
    pub fn simulator_runtime_prefix(&self) -> Option<&'static str> {
        match self {
            Platform::Ios => Some("com.apple.CoreSimulator.SimRuntime.iOS"),
            Platform::Tvos => Some("com.apple.CoreSimulator.SimRuntime.tvOS"),
            Platform::Macos => None,
        }
    }

    /// `hardwareProperties.platform` value reported by devicectl, lowercased.
    pub fn devicectl_platform(&self) -> Option<&'static str> {
        match self {
            Platform::Ios => Some("ios"),
            Platform::Tvos => Some("tvos"),
            Platform::Macos => None,
        }
    }

    /// Token identifying this platform's devices in the xctrace device table.
    pub fn device_table_token(&self) -> Option<&'static str> {
        match self {
            Platform::Ios => Some("iPhone"),
            Platform::Tvos => Some("Apple TV"),
            Platform::Macos => None,
        }
    }
}

impl FromStr for Platform {
    type Err = CliError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "macos" | "osx" => Ok(Platform::Macos),
            "tvos" | "appletvos" => Ok(Platform::Tvos),
            _ => Err(CliError::UnknownPlatform {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl DeviceClass {
    /// Suffix used in preference keys.
    pub fn key(&self) -> &'static str {
        match self {
            DeviceClass::Simulator => "simulator",
            DeviceClass::Physical => "device",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
