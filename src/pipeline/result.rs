//! Per-platform outcomes and the release summary.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};
use crate::platform::Platform;

/// A step of the pipeline, used to label results and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Clean then build for a simulator or the host Mac
    Build,
    /// Clean the build folder before archiving
    Clean,
    /// Produce an `.xcarchive`
    Archive,
    /// Turn an archive into an `.ipa` / `.pkg`
    Export,
    /// Send an artifact to App Store Connect
    Upload,
    /// Install a built app on a simulator
    Install,
    /// Launch a built app
    Launch,
}

impl Stage {
    /// Label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Build => "Build",
            Stage::Clean => "Clean",
            Stage::Archive => "Archive",
            Stage::Export => "Export",
            Stage::Upload => "Upload",
            Stage::Install => "Install",
            Stage::Launch => "Launch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where one platform got to during a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    /// Platform this result is for
    pub platform: Platform,
    /// Last stage attempted
    pub stage: Stage,
    /// Whether every attempted stage succeeded
    pub success: bool,
    /// Archive produced, if any
    pub archive_path: Option<PathBuf>,
    /// Export directory produced, if any
    pub export_dir: Option<PathBuf>,
    /// Artifact that was uploaded, if any
    pub uploaded_artifact: Option<PathBuf>,
    /// Upload was skipped because no artifact was found
    pub upload_skipped: bool,
    /// Failure message, if any
    pub error: Option<String>,
}

impl PipelineResult {
    /// Fresh result; nothing attempted past the clean step
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            stage: Stage::Clean,
            success: true,
            archive_path: None,
            export_dir: None,
            uploaded_artifact: None,
            upload_skipped: false,
            error: None,
        }
    }

    /// Record a successful archive
    pub fn archived(&mut self, path: PathBuf) {
        self.stage = Stage::Archive;
        self.archive_path = Some(path);
    }

    /// Record a successful export
    pub fn exported(&mut self, dir: PathBuf) {
        self.stage = Stage::Export;
        self.export_dir = Some(dir);
    }

    /// Record a successful upload
    pub fn uploaded(&mut self, artifact: PathBuf) {
        self.stage = Stage::Upload;
        self.uploaded_artifact = Some(artifact);
    }

    /// Record that upload was skipped for lack of an artifact
    pub fn skip_upload(&mut self) {
        self.stage = Stage::Upload;
        self.upload_skipped = true;
    }

    /// Record a failure at `stage`
    pub fn fail(&mut self, stage: Stage, error: &ReleaseError) {
        self.stage = stage;
        self.success = false;
        self.error = Some(error.to_string());
    }

    /// Stage this platform failed at, if it failed
    pub fn failed_stage(&self) -> Option<Stage> {
        (!self.success).then_some(self.stage)
    }
}

/// Outcome of a multi-platform release.
#[derive(Debug)]
pub struct ReleaseSummary {
    /// One entry per selected platform, in release order
    pub results: Vec<PipelineResult>,
    /// Directory exports were written to
    pub exports_dir: PathBuf,
    /// The release stopped after archiving on request
    pub archive_only: bool,
    failure: Option<ReleaseError>,
}

impl ReleaseSummary {
    pub(crate) fn new(platforms: &[Platform], exports_dir: &Path, archive_only: bool) -> Self {
        Self {
            results: platforms.iter().copied().map(PipelineResult::new).collect(),
            exports_dir: exports_dir.to_path_buf(),
            archive_only,
            failure: None,
        }
    }

    /// Whether the release completed
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Error that stopped the release, if any
    pub fn failure(&self) -> Option<&ReleaseError> {
        self.failure.as_ref()
    }

    /// Result for `platform`
    pub fn result(&self, platform: Platform) -> Option<&PipelineResult> {
        self.results.iter().find(|r| r.platform == platform)
    }

    /// Archives created, in release order
    pub fn archives(&self) -> impl Iterator<Item = &Path> {
        self.results.iter().filter_map(|r| r.archive_path.as_deref())
    }

    /// Keep the first failure; later ones are recorded per platform only
    pub(crate) fn record_failure(&mut self, error: ReleaseError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }

    /// The summary on success, the stopping error otherwise
    pub fn into_result(self) -> Result<Self> {
        match self.failure {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}
