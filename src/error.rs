//! Error types for xcode_release operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for xcode_release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all xcode_release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Device selection errors
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// External toolchain stage errors
    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    /// Missing input files detected before invoking the toolchain
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Upload credential errors
    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    /// Preference store errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Device discovery errors.
///
/// Never surfaced to the operator as a command failure, so there is no
/// [`ReleaseError`] variant for them; the catalog logs them and treats the
/// source as having no devices.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Discovery tool could not be run or exited non-zero
    #[error("{source_name} failed: {reason}")]
    ToolFailed {
        /// Name of the discovery source
        source_name: String,
        /// Reason for the error
        reason: String,
    },

    /// Discovery output could not be parsed
    #[error("Could not parse {source_name} output: {reason}")]
    ParseFailed {
        /// Name of the discovery source
        source_name: String,
        /// Reason for the error
        reason: String,
    },

    /// Discovery output file could not be prepared or read
    #[error("{source_name} output file error: {source}")]
    OutputFile {
        /// Name of the discovery source
        source_name: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Device selection errors
#[derive(Error, Debug)]
pub enum SelectionError {
    /// No device could be resolved for the platform
    #[error("No {device_class} selected for {platform}")]
    NoDevice {
        /// Platform display label
        platform: String,
        /// Device class label
        device_class: String,
    },
}

/// Errors from an external toolchain invocation
#[derive(Error, Debug)]
pub enum StageError {
    /// Program is not installed or not on PATH
    #[error("'{program}' not found on PATH")]
    ToolMissing {
        /// Program name
        program: String,
    },

    /// Process could not be spawned
    #[error("Failed to run {command}: {source}")]
    SpawnFailed {
        /// Rendered command line
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Process exited unsuccessfully
    #[error("{stage} failed ({command} exited with {status}){}", format_diagnostic(.diagnostic))]
    CommandFailed {
        /// Stage name
        stage: String,
        /// Rendered command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured diagnostic output from the command, if any
        diagnostic: String,
    },

    /// Process succeeded but produced nothing usable
    #[error("{stage} produced no usable output: {reason}")]
    MissingOutput {
        /// Stage name
        stage: String,
        /// Reason for the error
        reason: String,
    },
}

fn format_diagnostic(diagnostic: &str) -> String {
    if diagnostic.trim().is_empty() {
        String::new()
    } else {
        format!(":\n{}", diagnostic.trim_end())
    }
}

/// Missing inputs detected before the toolchain runs
#[derive(Error, Debug)]
pub enum PreconditionError {
    /// Archive directory missing
    #[error("Archive not found at '{}'", .path.display())]
    ArchiveNotFound {
        /// Expected archive path
        path: PathBuf,
    },

    /// Export options plist missing
    #[error("Export options plist not found at '{}'", .path.display())]
    ExportOptionsNotFound {
        /// Expected plist path
        path: PathBuf,
    },

    /// Artifact to upload missing
    #[error("Artifact not found at '{}'", .path.display())]
    ArtifactNotFound {
        /// Expected artifact path
        path: PathBuf,
    },

    /// API key file missing
    #[error("API key file not found at '{}'", .path.display())]
    KeyFileNotFound {
        /// Expected key path
        path: PathBuf,
    },

    /// Built app bundle missing after a build
    #[error("Could not find built app at '{}'", .path.display())]
    AppNotFound {
        /// Expected app path
        path: PathBuf,
    },
}

/// Upload credential errors
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No credential variable is set at all
    #[error("{0} is required for upload")]
    Missing(&'static str),

    /// Some but not all credential variables are set
    #[error("Incomplete App Store Connect API key configuration; missing {}", .missing.join(", "))]
    Incomplete {
        /// Names of the unset variables
        missing: Vec<&'static str>,
    },
}

/// Preference store errors
#[derive(Error, Debug)]
pub enum StateError {
    /// Preference file is not a JSON object
    #[error("Preference file {} is corrupted: {reason}", .path.display())]
    Corrupted {
        /// Preference file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Failed to save preferences
    #[error("Failed to save preferences to {}: {reason}", .path.display())]
    SaveFailed {
        /// Preference file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Unknown platform name
    #[error("Invalid platform '{value}'. Must be ios, macos, or tvos.")]
    UnknownPlatform {
        /// Value given on the command line
        value: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Selection(SelectionError::NoDevice { device_class, .. }) => vec![
                format!("List available targets: xcode_release list --{device_class}s"),
                "Pass --target <name|udid> to pick a device explicitly".to_string(),
                "Pass --select to choose again instead of the saved default".to_string(),
            ],
            ReleaseError::Stage(StageError::ToolMissing { .. }) => vec![
                "Install Xcode and its command line tools: xcode-select --install".to_string(),
                "Check the active developer directory: xcode-select -p".to_string(),
            ],
            ReleaseError::Credentials(CredentialError::Missing(_))
            | ReleaseError::Credentials(CredentialError::Incomplete { .. }) => vec![
                "Set APP_STORE_CONNECT_API_KEY_PATH, APP_STORE_CONNECT_API_KEY_ID and APP_STORE_CONNECT_API_ISSUER_ID"
                    .to_string(),
                "Or put them in a .env file at the project root".to_string(),
            ],
            ReleaseError::Precondition(PreconditionError::ExportOptionsNotFound { .. }) => vec![
                "Create the export options plist or pass its path explicitly".to_string(),
                "Use --export-options-dir to point at the directory holding exportOptions.<platform>.plist"
                    .to_string(),
            ],
            ReleaseError::State(StateError::Corrupted { path, .. }) => vec![format!(
                "Remove or fix {} to reset saved devices",
                path.display()
            )],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Whether the failure happened before any toolchain stage was attempted
    pub fn is_pre_stage(&self) -> bool {
        matches!(
            self,
            ReleaseError::Selection(_)
                | ReleaseError::Precondition(_)
                | ReleaseError::Credentials(_)
                | ReleaseError::Cli(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_includes_diagnostic_text() {
        let err = StageError::CommandFailed {
            stage: "Archive".to_string(),
            command: "xcodebuild archive".to_string(),
            status: "exit status: 65".to_string(),
            diagnostic: "error: No signing certificate\n".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("Archive failed (xcodebuild archive exited with exit status: 65)"));
        assert!(message.ends_with("No signing certificate"));
    }

    #[test]
    fn command_failure_without_diagnostic_has_no_trailer() {
        let err = StageError::CommandFailed {
            stage: "Build".to_string(),
            command: "xcodebuild build".to_string(),
            status: "exit status: 1".to_string(),
            diagnostic: "  ".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Build failed (xcodebuild build exited with exit status: 1)"
        );
    }

    #[test]
    fn incomplete_credentials_name_the_missing_variables() {
        let err = CredentialError::Incomplete {
            missing: vec!["APP_STORE_CONNECT_API_ISSUER_ID"],
        };
        assert!(err.to_string().contains("APP_STORE_CONNECT_API_ISSUER_ID"));
        assert!(err.to_string().starts_with("Incomplete"));
    }

    #[test]
    fn credential_errors_are_pre_stage() {
        let err: ReleaseError = CredentialError::Missing("APP_STORE_CONNECT_API_KEY_PATH").into();
        assert!(err.is_pre_stage());
        assert!(!err.recovery_suggestions().is_empty());

        let stage: ReleaseError = StageError::ToolMissing {
            program: "xcrun".to_string(),
        }
        .into();
        assert!(!stage.is_pre_stage());
    }
}
