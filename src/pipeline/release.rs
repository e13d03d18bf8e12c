//! Multi-platform release: archive everything, export everything, upload.
//!
//! Gating:
//! - any archive failure skips export and upload for every platform
//! - the first export failure stops the release
//! - a platform without an artifact is skipped at upload; an upload failure
//!   stops the release

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{ArchiveOptions, ExportRequest, PipelineRunner, ReleaseSummary, Stage};
use crate::credentials::is_ci;
use crate::error::{PreconditionError, Result};
use crate::platform::Platform;

/// What to release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    /// Platforms, in release order
    pub platforms: Vec<Platform>,
    /// Archive to Xcode's Organizer folder
    pub show_in_organizer: bool,
    /// Stop successfully after archiving
    pub skip_export: bool,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self {
            platforms: Platform::ALL.to_vec(),
            show_in_organizer: false,
            skip_export: false,
        }
    }
}

/// File name patterns tried, in order, when looking for a platform's artifact.
fn artifact_patterns(scheme: &str, platform: Platform) -> [String; 2] {
    let canonical = format!(
        "{}.{}",
        platform.archive_stem(scheme),
        platform.artifact_extension()
    );
    let wildcard = match platform {
        Platform::Ios => "*.ipa",
        Platform::Macos => "*.pkg",
        Platform::Tvos => "*tvOS*.ipa",
    };
    [canonical, wildcard.to_string()]
}

/// Find the artifact to upload for `platform` anywhere under `exports_dir`.
///
/// The canonical name is tried first, then a platform wildcard; iOS never
/// picks up a file ending in `tvOS.ipa`. Among several candidates the
/// lexicographically last path wins, which for timestamped export
/// directories is the most recent.
pub fn find_release_artifact(exports_dir: &Path, scheme: &str, platform: Platform) -> Option<PathBuf> {
    let files: Vec<PathBuf> = WalkDir::new(exports_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    for pattern in artifact_patterns(scheme, platform) {
        let Ok(pattern) = glob::Pattern::new(&pattern) else {
            continue;
        };

        let mut candidates: Vec<&PathBuf> = files
            .iter()
            .filter(|path| {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    return false;
                };
                pattern.matches(name) && !(platform == Platform::Ios && name.ends_with("tvOS.ipa"))
            })
            .collect();
        candidates.sort();

        if let Some(found) = candidates.last() {
            return Some((*found).clone());
        }
    }

    None
}

impl PipelineRunner<'_> {
    /// Archive, export and upload every selected platform.
    ///
    /// Missing per-platform export options are reported before anything
    /// runs. Stage failures are recorded in the returned summary.
    pub fn release(&self, options: &ReleaseOptions) -> Result<ReleaseSummary> {
        let exports_dir = self.project.exports_dir();

        if !options.skip_export {
            for &platform in &options.platforms {
                let plist = self.project.platform_export_options(platform);
                if !plist.is_file() {
                    return Err(PreconditionError::ExportOptionsNotFound { path: plist }.into());
                }
            }
        }

        let mut summary = ReleaseSummary::new(&options.platforms, &exports_dir, options.skip_export);

        self.config
            .section(&format!("{} - Release", self.project.scheme));
        self.config
            .println("Step 1: Creating archives for all platforms...");

        if !self.archive_all(&mut summary, options) {
            self.config
                .error_println("Some archives failed! Skipping export.");
            return Ok(summary);
        }
        self.config
            .success_println("All archives created successfully!");

        if options.skip_export {
            self.config
                .warning_println("Skip export requested. Release process finished after archive.");
            return Ok(summary);
        }

        self.config.println("");
        self.config.println("Step 2: Exporting all archives...");
        if !self.export_all(&mut summary) {
            return Ok(summary);
        }
        self.config
            .success_println("All exports completed successfully!");

        self.config.println("");
        self.config.println("Uploading exported builds...");
        if !self.upload_all(&mut summary) {
            return Ok(summary);
        }

        self.print_summary(&summary);
        Ok(summary)
    }

    /// Archive every platform, continuing past failures so each is reported.
    fn archive_all(&self, summary: &mut ReleaseSummary, options: &ReleaseOptions) -> bool {
        let archive_options = ArchiveOptions {
            destination: self.project.archives_dir(),
            show_in_organizer: options.show_in_organizer,
            ci_mode: is_ci(self.env),
        };

        let mut first_failure = None;
        for result in summary.results.iter_mut() {
            let platform = result.platform;
            self.config.section(&format!("Archiving for {platform}"));

            match self.archive(platform, &archive_options) {
                Ok(path) => {
                    self.config
                        .success_println(&format!("Archive saved: {}", path.display()));
                    result.archived(path);
                }
                Err(e) => {
                    self.config
                        .error_println(&format!("Archive failed for {platform}: {e}"));
                    result.fail(Stage::Archive, &e);
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
        }

        match first_failure {
            Some(e) => {
                summary.record_failure(e);
                false
            }
            None => true,
        }
    }

    /// Export each archive in order, stopping at the first failure.
    fn export_all(&self, summary: &mut ReleaseSummary) -> bool {
        let exports_dir = summary.exports_dir.clone();

        for index in 0..summary.results.len() {
            let result = &mut summary.results[index];
            let platform = result.platform;
            let Some(archive) = result.archive_path.clone() else {
                continue;
            };

            self.config
                .section(&format!("Exporting {platform} archive"));

            let request = ExportRequest {
                archive,
                export_options: Some(self.project.platform_export_options(platform)),
                destination: Some(exports_dir.clone()),
                keep_archive: true,
                platform: Some(platform),
            };

            match self.export(&request) {
                Ok(dir) => result.exported(dir),
                Err(e) => {
                    self.config
                        .error_println(&format!("Export failed for {platform}: {e}"));
                    result.fail(Stage::Export, &e);
                    summary.record_failure(e);
                    return false;
                }
            }
        }

        true
    }

    /// Upload each platform's artifact, stopping at the first failure.
    fn upload_all(&self, summary: &mut ReleaseSummary) -> bool {
        for index in 0..summary.results.len() {
            let platform = summary.results[index].platform;

            let Some(artifact) =
                find_release_artifact(&summary.exports_dir, &self.project.scheme, platform)
            else {
                self.config.warning_println(&format!(
                    "No artifact found for {platform}; skipping upload."
                ));
                summary.results[index].skip_upload();
                continue;
            };

            match self.upload(&artifact, platform) {
                Ok(()) => summary.results[index].uploaded(artifact),
                Err(e) => {
                    self.config
                        .error_println(&format!("Upload failed for {platform}: {e}"));
                    summary.results[index].fail(Stage::Upload, &e);
                    summary.record_failure(e);
                    return false;
                }
            }
        }

        true
    }

    fn print_summary(&self, summary: &ReleaseSummary) {
        self.config.section("Release Summary");
        self.config.println("Archives created:");
        for archive in summary.archives() {
            self.config.indent(&format!("- {}", archive.display()));
        }
        self.config.println("");
        self.config.println("Exports location:");
        self.config
            .indent(&format!("- {}", summary.exports_dir.display()));
        self.config.println("");
        self.config
            .success_println("Release process completed!");
    }
}
