//! Command line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_PROJECT, DEFAULT_SCHEME};
use crate::platform::{DeviceClass, Platform};

/// Build, archive, export and upload an Xcode project
#[derive(Parser, Debug)]
#[command(
    name = "xcode_release",
    version,
    about = "Build, archive, export and upload an Xcode project",
    long_about = "Drive xcodebuild, simctl, devicectl and altool for an Xcode project.

Usage:
  xcode_release build ios
  xcode_release archive tvos --ci
  xcode_release export archives/KMReader-iOS_20250101_093000.xcarchive --platform ios
  xcode_release upload exports/export_20250101_093000/KMReader-iOS.ipa ios
  xcode_release release --platform macos
  xcode_release run ios --device --select
  xcode_release list tvos --simulators"
)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Xcode scheme
    #[arg(long, global = true, env = "XCODE_RELEASE_SCHEME", default_value = DEFAULT_SCHEME)]
    pub scheme: String,

    /// Path to the .xcodeproj
    #[arg(long, global = true, env = "XCODE_RELEASE_PROJECT", default_value = DEFAULT_PROJECT)]
    pub project: PathBuf,

    /// Saved device preferences
    #[arg(long, global = true, env = "XCODE_RELEASE_DEVICES_FILE")]
    pub devices_file: Option<PathBuf>,

    /// Directory holding exportOptions*.plist
    #[arg(long, global = true, env = "XCODE_RELEASE_EXPORT_OPTIONS_DIR")]
    pub export_options_dir: Option<PathBuf>,

    /// Show extra detail and recovery suggestions
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Pipeline commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Clean and build for a simulator (or the host Mac)
    Build {
        /// Platform to build: ios, macos or tvos
        platform: Platform,

        /// Skip validation and disable code signing
        #[arg(long)]
        ci: bool,
    },

    /// Clean and archive in the Release configuration
    Archive {
        /// Platform to archive: ios, macos or tvos
        platform: Platform,

        /// Directory for the .xcarchive
        #[arg(long, default_value = "./archives")]
        destination: PathBuf,

        /// Archive to Xcode's Organizer folder
        #[arg(long)]
        show_in_organizer: bool,

        /// Skip macro and package plugin validation (also set by CI=1)
        #[arg(long)]
        ci: bool,
    },

    /// Export an archive to an .ipa or .pkg
    Export {
        /// .xcarchive to export
        archive_path: PathBuf,

        /// Export options plist
        export_options: Option<PathBuf>,

        /// Parent directory for export_<timestamp>
        destination: Option<PathBuf>,

        /// Keep the archive after exporting
        #[arg(long)]
        keep_archive: bool,

        /// Rename the artifact to <Scheme>-<Platform>.<ext>
        #[arg(long)]
        platform: Option<Platform>,
    },

    /// Upload an exported artifact to App Store Connect
    Upload {
        /// .ipa or .pkg to upload
        artifact_path: PathBuf,

        /// Platform the artifact was built for: ios, macos or tvos
        platform: Platform,
    },

    /// Archive, export and upload every platform
    Release {
        /// Archive to Xcode's Organizer folder
        #[arg(long)]
        show_in_organizer: bool,

        /// Stop after archiving
        #[arg(long)]
        skip_export: bool,

        /// Release a single platform
        #[arg(long)]
        platform: Option<Platform>,
    },

    /// Build and launch on a simulator, a device or the host Mac
    Run {
        /// Platform to run: ios, macos or tvos
        platform: Platform,

        /// Run on a simulator (default)
        #[arg(long, conflicts_with = "device")]
        simulator: bool,

        /// Build for an attached device
        #[arg(long)]
        device: bool,

        /// Device name or identifier
        #[arg(long)]
        target: Option<String>,

        /// Choose a device even if one is saved
        #[arg(long)]
        select: bool,
    },

    /// List simulators and attached devices
    List {
        /// Platform to list (iOS and tvOS when omitted)
        platform: Option<Platform>,

        /// Only simulators
        #[arg(long)]
        simulators: bool,

        /// Only physical devices
        #[arg(long)]
        devices: bool,
    },
}

impl Command {
    /// Subcommand name, for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build { .. } => "build",
            Command::Archive { .. } => "archive",
            Command::Export { .. } => "export",
            Command::Upload { .. } => "upload",
            Command::Release { .. } => "release",
            Command::Run { .. } => "run",
            Command::List { .. } => "list",
        }
    }
}

/// Device class picked by `run`'s `--simulator` / `--device` flags.
pub fn run_device_class(device: bool) -> DeviceClass {
    if device {
        DeviceClass::Physical
    } else {
        DeviceClass::Simulator
    }
}

/// Device classes `list` should show; neither flag means both.
pub fn list_device_classes(simulators: bool, devices: bool) -> Vec<DeviceClass> {
    match (simulators, devices) {
        (true, false) => vec![DeviceClass::Simulator],
        (false, true) => vec![DeviceClass::Physical],
        _ => vec![DeviceClass::Simulator, DeviceClass::Physical],
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print message only with `--verbose`
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print progress message
    pub fn progress_println(&self, message: &str) {
        let _ = self.output.progress(message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}
