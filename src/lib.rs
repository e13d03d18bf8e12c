//! # xcode_release
//!
//! Device selection and a build → archive → export → upload pipeline for
//! Xcode projects.
//!
//! The crate drives the Xcode command line tools (`xcodebuild`, `simctl`,
//! `devicectl`, `xctrace`, `altool`) through the [`Toolchain`] trait, picks
//! simulators and devices with [`DeviceSelector`], remembers choices in a
//! [`PreferenceStore`] and runs multi-platform releases with
//! [`PipelineRunner`].
//!
//! ## Usage
//!
//! ```bash
//! xcode_release build ios             # Clean build for a simulator
//! xcode_release archive tvos --ci     # Release archive, CI flags on
//! xcode_release release               # Archive, export and upload everything
//! xcode_release run ios --device      # Build for an attached iPhone
//! ```

// load_env_file opts in for std::env::set_var
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod credentials;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod state;
pub mod toolchain;

#[cfg(test)]
mod test_support;

pub use cli::Args;
pub use config::ProjectConfig;
pub use credentials::{Credentials, EnvSource, ProcessEnv};
pub use device::{Device, DeviceCatalog, DeviceSelector, Prompt, SelectionRequest};
pub use error::{CliError, ReleaseError, Result};
pub use pipeline::{PipelineResult, PipelineRunner, ReleaseOptions, ReleaseSummary, Stage};
pub use platform::{DeviceClass, Platform};
pub use state::PreferenceStore;
pub use toolchain::{Invocation, SystemToolchain, ToolOutput, Toolchain};
