//! Build, archive, export and upload.
//!
//! [`PipelineRunner`] drives the Xcode toolchain one stage at a time. Every
//! stage returns an explicit result; nothing is retried. Invocations block
//! until the tool exits.

mod release;
mod result;
mod run;
mod stages;

pub use release::{ReleaseOptions, find_release_artifact};
pub use result::{PipelineResult, ReleaseSummary, Stage};
pub use run::{RunRequest, parse_built_products_dir};
pub use stages::{ArchiveOptions, ExportRequest, organizer_archive_dir};

use chrono::{Local, NaiveDateTime};

use crate::cli::RuntimeConfig;
use crate::config::ProjectConfig;
use crate::credentials::{Credentials, EnvSource, Resolution, is_ci};
use crate::toolchain::{Invocation, Toolchain};

/// Flags that skip macro and package plugin validation on CI machines.
const VALIDATION_SKIP_ARGS: [&str; 2] = ["-skipMacroValidation", "-skipPackagePluginValidation"];

/// Build settings that turn code signing off for CI builds.
const UNSIGNED_BUILD_ARGS: [&str; 3] = [
    "CODE_SIGN_IDENTITY=",
    "CODE_SIGNING_REQUIRED=NO",
    "CODE_SIGNING_ALLOWED=NO",
];

/// Build destination for the host Mac.
const MACOS_DESTINATION: &str = "platform=macOS";

/// Source of the current local time, for artifact names.
pub type Clock = fn() -> NaiveDateTime;

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Timestamp used in archive and export names, e.g. `20250101_093000`.
pub fn timestamp(now: NaiveDateTime) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Runs pipeline stages against one project.
pub struct PipelineRunner<'a> {
    toolchain: &'a dyn Toolchain,
    config: &'a RuntimeConfig,
    project: &'a ProjectConfig,
    env: &'a dyn EnvSource,
    clock: Clock,
}

impl<'a> PipelineRunner<'a> {
    /// Create a runner using the local clock
    pub fn new(
        toolchain: &'a dyn Toolchain,
        config: &'a RuntimeConfig,
        project: &'a ProjectConfig,
        env: &'a dyn EnvSource,
    ) -> Self {
        Self {
            toolchain,
            config,
            project,
            env,
            clock: local_now,
        }
    }

    /// Use `clock` for timestamps
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Project this runner builds
    pub fn project(&self) -> &ProjectConfig {
        self.project
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    /// `xcodebuild <action> -project P -scheme S`
    fn xcodebuild(&self, actions: &[&str]) -> Invocation {
        Invocation::new("xcodebuild")
            .args(actions.iter().copied())
            .args([
                "-project".to_string(),
                self.project.project.display().to_string(),
                "-scheme".to_string(),
                self.project.scheme.clone(),
            ])
    }

    /// Whether CI behaviour is on, from the flag or the environment
    fn ci_mode(&self, flag: bool) -> bool {
        flag || is_ci(self.env)
    }

    fn validation_args(&self, ci_mode: bool) -> Vec<&'static str> {
        if ci_mode {
            VALIDATION_SKIP_ARGS.to_vec()
        } else {
            Vec::new()
        }
    }

    /// xcodebuild authentication arguments, only for a complete key.
    fn auth_args(&self) -> Vec<String> {
        match Credentials::resolve(self.env) {
            Resolution::Complete(credentials) => {
                self.config
                    .success_println("Using App Store Connect API key for authentication");
                credentials.xcodebuild_args()
            }
            Resolution::Incomplete(missing) => {
                self.config.warning_println(&format!(
                    "Incomplete App Store Connect API key configuration (missing {}); skipping authentication arguments",
                    missing.join(", ")
                ));
                Vec::new()
            }
            Resolution::Absent => Vec::new(),
        }
    }
}
