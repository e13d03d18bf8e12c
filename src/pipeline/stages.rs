//! Single stages: build, archive, export, upload.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use walkdir::WalkDir;

use super::{MACOS_DESTINATION, PipelineRunner, Stage, UNSIGNED_BUILD_ARGS, timestamp};
use crate::config::expand_home;
use crate::credentials::Credentials;
use crate::device::{DeviceSelector, SelectionRequest};
use crate::error::{CliError, PreconditionError, Result, SelectionError, StageError};
use crate::platform::{DeviceClass, Platform};
use crate::toolchain::{Invocation, run_stage};

/// Where and how to archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Directory the `.xcarchive` is written to
    pub destination: PathBuf,
    /// Write to Xcode's dated Archives folder instead, so Organizer lists it
    pub show_in_organizer: bool,
    /// Skip macro and plugin validation
    pub ci_mode: bool,
}

/// An export of an existing archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// `.xcarchive` directory to export
    pub archive: PathBuf,
    /// Export options plist; the project default when `None`
    pub export_options: Option<PathBuf>,
    /// Parent of the `export_<timestamp>` directory; the project exports
    /// directory when `None`
    pub destination: Option<PathBuf>,
    /// Keep the archive after a successful export
    pub keep_archive: bool,
    /// Rename the produced artifact to `<Scheme>-<Platform>.<ext>`
    pub platform: Option<Platform>,
}

impl ExportRequest {
    /// Export `archive` with project defaults
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            export_options: None,
            destination: None,
            keep_archive: false,
            platform: None,
        }
    }
}

/// Xcode's Organizer archive folder for the day of `now`.
pub fn organizer_archive_dir(now: NaiveDateTime) -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| CliError::InvalidArguments {
        reason: "cannot locate the home directory for --show-in-organizer".to_string(),
    })?;
    Ok(home
        .join("Library/Developer/Xcode/Archives")
        .join(now.format("%Y-%m-%d").to_string()))
}

impl PipelineRunner<'_> {
    /// Clean and build `platform`.
    ///
    /// iOS and tvOS build for a simulator picked by `selector`; the build
    /// never needs a physical device. Without a simulator nothing is run.
    pub fn build(
        &self,
        selector: &mut DeviceSelector<'_>,
        platform: Platform,
        ci_mode: bool,
    ) -> Result<()> {
        let destination = if platform.has_devices() {
            let request = SelectionRequest::new(platform, DeviceClass::Simulator);
            let udid = selector
                .select(&request)
                .ok_or_else(|| SelectionError::NoDevice {
                    platform: platform.to_string(),
                    device_class: DeviceClass::Simulator.to_string(),
                })?;
            format!("id={udid}")
        } else {
            MACOS_DESTINATION.to_string()
        };

        self.config
            .progress_println(&format!("Building for {platform}..."));

        let mut invocation = self
            .xcodebuild(&[])
            .args(["clean", "build", "-quiet", "-destination"])
            .arg(destination);
        if ci_mode {
            invocation = invocation
                .args(self.validation_args(true))
                .args(UNSIGNED_BUILD_ARGS);
        }

        run_stage(self.toolchain, Stage::Build.label(), &invocation)?;
        self.config
            .success_println(&format!("{platform} built successfully!"));
        Ok(())
    }

    /// Clean, then archive `platform` in the Release configuration.
    ///
    /// Returns the path of the new `.xcarchive`.
    pub fn archive(&self, platform: Platform, options: &ArchiveOptions) -> Result<PathBuf> {
        let now = self.now();
        let root = if options.show_in_organizer {
            self.config.warning_println(
                "Note: Archive will be saved to Xcode's default location and appear in Organizer",
            );
            organizer_archive_dir(now)?
        } else {
            expand_home(&options.destination.to_string_lossy())
        };
        fs::create_dir_all(&root)?;

        let archive_path = root.join(format!(
            "{}_{}.xcarchive",
            platform.archive_stem(&self.project.scheme),
            timestamp(now)
        ));
        let destination = platform.archive_destination();

        self.config
            .progress_println(&format!("Starting archive for {platform}..."));
        self.config
            .indent(&format!("Scheme: {}", self.project.scheme));
        self.config.indent(&format!("Destination: {destination}"));
        self.config
            .indent(&format!("Archive path: {}", archive_path.display()));

        let ci_mode = self.ci_mode(options.ci_mode);
        if ci_mode {
            self.config
                .warning_println("CI detected: skipping macro/plugin validation");
        }
        let validation = self.validation_args(ci_mode);
        let auth = self.auth_args();

        let clean = self
            .xcodebuild(&["clean"])
            .args(["-configuration", "Release", "-destination", destination, "-quiet"])
            .args(validation.iter().copied())
            .args(auth.iter().cloned());

        let archive = self
            .xcodebuild(&["archive"])
            .args(["-configuration", "Release", "-destination", destination])
            .arg("-archivePath")
            .arg(archive_path.display().to_string())
            .arg("-quiet")
            .args(validation.iter().copied())
            .args(auth.iter().cloned());

        self.config.verbose_println("Cleaning build folder...");
        run_stage(self.toolchain, Stage::Clean.label(), &clean)?;
        self.config.verbose_println("Archiving...");
        run_stage(self.toolchain, Stage::Archive.label(), &archive)?;

        self.config.success_println("Archive created successfully!");
        self.config
            .indent(&format!("Archive location: {}", archive_path.display()));
        if options.show_in_organizer {
            self.config
                .println("Archive is now available in Xcode Organizer (Window > Organizer)");
        }
        Ok(archive_path)
    }

    /// Export an archive to a distributable artifact.
    ///
    /// Missing archive or export options are reported before anything runs.
    /// Returns the `export_<timestamp>` directory.
    pub fn export(&self, request: &ExportRequest) -> Result<PathBuf> {
        let archive = expand_home(&request.archive.to_string_lossy());
        let export_options = request
            .export_options
            .as_deref()
            .map(|p| expand_home(&p.to_string_lossy()))
            .unwrap_or_else(|| self.project.default_export_options());
        let destination = request
            .destination
            .as_deref()
            .map(|p| expand_home(&p.to_string_lossy()))
            .unwrap_or_else(|| self.project.exports_dir());

        if !archive.is_dir() {
            return Err(PreconditionError::ArchiveNotFound { path: archive }.into());
        }
        if !export_options.is_file() {
            return Err(PreconditionError::ExportOptionsNotFound {
                path: export_options,
            }
            .into());
        }

        fs::create_dir_all(&destination)?;
        let export_path = destination.join(format!("export_{}", timestamp(self.now())));

        self.config.progress_println("Starting export...");
        self.config
            .indent(&format!("Archive: {}", archive.display()));
        self.config
            .indent(&format!("Export options: {}", export_options.display()));
        self.config
            .indent(&format!("Export path: {}", export_path.display()));

        let invocation = Invocation::new("xcodebuild")
            .arg("-exportArchive")
            .arg("-archivePath")
            .arg(archive.display().to_string())
            .arg("-exportPath")
            .arg(export_path.display().to_string())
            .arg("-exportOptionsPlist")
            .arg(export_options.display().to_string())
            .arg("-quiet")
            .args(self.auth_args());
        run_stage(self.toolchain, Stage::Export.label(), &invocation)?;

        if let Some(platform) = request.platform {
            self.canonicalize_artifact(&export_path, platform)?;
        }

        self.config.success_println("Export completed successfully!");
        self.config
            .indent(&format!("Export location: {}", export_path.display()));
        self.list_exported_files(&export_path);

        if request.keep_archive {
            self.config
                .verbose_println(&format!("Archive kept at: {}", archive.display()));
        } else {
            match fs::remove_dir_all(&archive) {
                Ok(()) => self.config.success_println("Archive deleted"),
                Err(e) => self.config.warning_println(&format!(
                    "Could not delete archive {}: {e}",
                    archive.display()
                )),
            }
        }

        Ok(export_path)
    }

    /// Rename the first `*.<ext>` in `export_path` to the canonical name.
    ///
    /// Nothing is renamed when an artifact already has the canonical name.
    /// An existing file at the target is overwritten.
    fn canonicalize_artifact(&self, export_path: &Path, platform: Platform) -> Result<Option<PathBuf>> {
        let extension = platform.artifact_extension();
        let canonical = export_path.join(format!(
            "{}.{extension}",
            platform.archive_stem(&self.project.scheme)
        ));

        let pattern = format!(
            "{}/*.{extension}",
            glob::Pattern::escape(&export_path.to_string_lossy())
        );
        let produced: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| StageError::MissingOutput {
                stage: Stage::Export.label().to_string(),
                reason: format!("invalid artifact pattern: {e}"),
            })?
            .filter_map(|entry| entry.ok())
            .collect();

        if produced.iter().any(|p| p == &canonical) {
            return Ok(Some(canonical));
        }
        let Some(first) = produced.first() else {
            log::warn!("No .{extension} found in {}", export_path.display());
            return Ok(None);
        };

        fs::rename(first, &canonical)?;
        self.config.success_println(&format!(
            "Renamed {} -> {}",
            file_name(first),
            file_name(&canonical)
        ));
        Ok(Some(canonical))
    }

    fn list_exported_files(&self, export_path: &Path) {
        let entries: Vec<_> = WalkDir::new(export_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .collect();
        if entries.is_empty() {
            return;
        }

        self.config.println("Exported files:");
        for entry in entries {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            self.config
                .indent(&format!("- {} ({size} bytes)", entry.file_name().to_string_lossy()));
        }
    }

    /// Upload an exported artifact to App Store Connect.
    ///
    /// The artifact and a complete credential set with an existing key file
    /// are checked before `altool` runs.
    pub fn upload(&self, artifact: &Path, platform: Platform) -> Result<()> {
        let artifact = expand_home(&artifact.to_string_lossy());
        if !artifact.is_file() {
            return Err(PreconditionError::ArtifactNotFound { path: artifact }.into());
        }

        let credentials = Credentials::for_upload(self.env)?;

        self.config.progress_println(&format!(
            "Uploading {} ({platform}) to App Store Connect...",
            artifact.display()
        ));

        let invocation = Invocation::new("xcrun")
            .args(["altool", "--upload-app", "-f"])
            .arg(artifact.display().to_string())
            .arg("-t")
            .arg(platform.upload_type())
            .args(credentials.altool_args());
        run_stage(self.toolchain, Stage::Upload.label(), &invocation)?;

        self.config
            .success_println(&format!("Upload completed for {}", artifact.display()));
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
