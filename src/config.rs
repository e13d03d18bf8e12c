//! Project configuration.
//!
//! Everything the pipeline needs to know about the Xcode project it drives:
//! scheme, project file, where saved devices live and where export options,
//! archives and exports are found.

use std::path::{Path, PathBuf};

use crate::platform::Platform;
use crate::state::DEFAULT_PREFERENCES_FILE;

/// Default scheme name
pub const DEFAULT_SCHEME: &str = "KMReader";
/// Default project file, relative to the working directory
pub const DEFAULT_PROJECT: &str = "KMReader.xcodeproj";
/// Export options used by `export` when none is given
pub const DEFAULT_EXPORT_OPTIONS_FILE: &str = "exportOptions.plist";

/// Resolved project settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Scheme to build
    pub scheme: String,
    /// Absolute path to the `.xcodeproj`
    pub project: PathBuf,
    /// Preference file for saved devices
    pub devices_file: PathBuf,
    /// Directory holding `exportOptions*.plist`
    pub export_options_dir: PathBuf,
    /// Working directory the configuration was resolved against
    pub working_dir: PathBuf,
}

impl ProjectConfig {
    /// Resolve settings against `working_dir`.
    ///
    /// Relative paths are taken relative to `working_dir`. Without an
    /// explicit export options directory, `<project root>/misc` is used.
    pub fn resolve(
        scheme: impl Into<String>,
        project: &Path,
        devices_file: Option<&Path>,
        export_options_dir: Option<&Path>,
        working_dir: &Path,
    ) -> Self {
        let absolute = |p: &Path| {
            let p = expand_home(&p.to_string_lossy());
            if p.is_absolute() { p } else { working_dir.join(p) }
        };

        let project = absolute(project);
        let project_root = project
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| working_dir.to_path_buf());

        Self {
            scheme: scheme.into(),
            devices_file: devices_file
                .map(absolute)
                .unwrap_or_else(|| working_dir.join(DEFAULT_PREFERENCES_FILE)),
            export_options_dir: export_options_dir
                .map(absolute)
                .unwrap_or_else(|| project_root.join("misc")),
            project,
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Directory containing the project file
    pub fn project_root(&self) -> &Path {
        self.project.parent().unwrap_or(self.working_dir.as_path())
    }

    /// Where `release` writes archives
    pub fn archives_dir(&self) -> PathBuf {
        self.project_root().join("archives")
    }

    /// Where exports are written by default
    pub fn exports_dir(&self) -> PathBuf {
        self.project_root().join("exports")
    }

    /// Export options used when `export` is given none
    pub fn default_export_options(&self) -> PathBuf {
        self.export_options_dir.join(DEFAULT_EXPORT_OPTIONS_FILE)
    }

    /// Per-platform export options used by `release`
    pub fn platform_export_options(&self, platform: Platform) -> PathBuf {
        self.export_options_dir.join(platform.export_options_file())
    }

    /// `.env` locations, in search order
    pub fn env_file_candidates(&self) -> Vec<PathBuf> {
        vec![
            self.project_root().join(".env"),
            self.working_dir.join(".env"),
        ]
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_working_dir() {
        let config = ProjectConfig::resolve(
            "KMReader",
            Path::new("app/KMReader.xcodeproj"),
            None,
            None,
            Path::new("/work"),
        );
        assert_eq!(config.project, PathBuf::from("/work/app/KMReader.xcodeproj"));
        assert_eq!(config.project_root(), Path::new("/work/app"));
        assert_eq!(config.devices_file, PathBuf::from("/work/devices.json"));
        assert_eq!(config.export_options_dir, PathBuf::from("/work/app/misc"));
        assert_eq!(config.archives_dir(), PathBuf::from("/work/app/archives"));
        assert_eq!(config.exports_dir(), PathBuf::from("/work/app/exports"));
    }

    #[test]
    fn explicit_locations_win() {
        let config = ProjectConfig::resolve(
            "Reader",
            Path::new("/src/Reader.xcodeproj"),
            Some(Path::new("state/devices.json")),
            Some(Path::new("/opts")),
            Path::new("/work"),
        );
        assert_eq!(config.devices_file, PathBuf::from("/work/state/devices.json"));
        assert_eq!(
            config.platform_export_options(Platform::Tvos),
            PathBuf::from("/opts/exportOptions.tvos.plist")
        );
        assert_eq!(
            config.default_export_options(),
            PathBuf::from("/opts/exportOptions.plist")
        );
    }

    #[test]
    fn env_files_are_searched_at_project_root_then_working_dir() {
        let config = ProjectConfig::resolve(
            "KMReader",
            Path::new("/src/KMReader.xcodeproj"),
            None,
            None,
            Path::new("/work"),
        );
        assert_eq!(
            config.env_file_candidates(),
            vec![PathBuf::from("/src/.env"), PathBuf::from("/work/.env")]
        );
    }

    #[test]
    fn home_prefix_expands() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/keys/a.p8"), home.join("keys/a.p8"));
            assert_eq!(expand_home("~"), home);
        }
        assert_eq!(expand_home("/abs/a.p8"), PathBuf::from("/abs/a.p8"));
        assert_eq!(expand_home("~user/a.p8"), PathBuf::from("~user/a.p8"));
    }
}
