//! Build and launch for local development.

use std::path::PathBuf;

use super::{MACOS_DESTINATION, PipelineRunner, Stage};
use crate::device::{DeviceSelector, SelectionRequest};
use crate::error::{PreconditionError, Result, SelectionError, StageError};
use crate::platform::{DeviceClass, Platform};
use crate::toolchain::{Invocation, run_stage};

/// Where to run.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'r> {
    /// Target platform
    pub platform: Platform,
    /// Simulator or physical device; ignored for macOS
    pub class: DeviceClass,
    /// Device name or identifier
    pub target: Option<&'r str>,
    /// Ask even when a saved device is available
    pub force_select: bool,
}

/// `BUILT_PRODUCTS_DIR` from `xcodebuild -showBuildSettings` output.
pub fn parse_built_products_dir(settings: &str) -> Option<PathBuf> {
    settings.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == "BUILT_PRODUCTS_DIR")
            .then(|| value.trim())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

impl PipelineRunner<'_> {
    /// Build and launch on the host Mac, a simulator or a device.
    ///
    /// Physical devices are built for only; the app is launched by hand.
    pub fn run(&self, selector: &mut DeviceSelector<'_>, request: &RunRequest<'_>) -> Result<()> {
        let platform = request.platform;
        if !platform.has_devices() {
            return self.run_on_mac();
        }

        let selection = SelectionRequest::new(platform, request.class)
            .with_target(request.target)
            .forcing_prompt(request.force_select);
        let udid = selector
            .select(&selection)
            .ok_or_else(|| SelectionError::NoDevice {
                platform: platform.to_string(),
                device_class: request.class.to_string(),
            })?;

        match request.class {
            DeviceClass::Simulator => self.run_on_simulator(platform, &udid),
            DeviceClass::Physical => self.run_on_device(platform, &udid),
        }
    }

    fn development_build(&self, destination: &str) -> Invocation {
        self.xcodebuild(&[])
            .args(["-destination", destination, "build", "-quiet"])
    }

    /// Build for `destination` and return the path of the built `.app`.
    fn build_app(&self, destination: &str) -> Result<PathBuf> {
        let build = self.development_build(destination);
        run_stage(self.toolchain, Stage::Build.label(), &build)?;

        let settings = build.clone().arg("-showBuildSettings").captured();
        let output = run_stage(self.toolchain, Stage::Build.label(), &settings)?;

        let products = parse_built_products_dir(&output.stdout).ok_or_else(|| StageError::MissingOutput {
            stage: Stage::Build.label().to_string(),
            reason: "BUILT_PRODUCTS_DIR not found in build settings".to_string(),
        })?;

        let app = products.join(format!("{}.app", self.project.scheme));
        if !app.exists() {
            return Err(PreconditionError::AppNotFound { path: app }.into());
        }
        Ok(app)
    }

    fn run_on_mac(&self) -> Result<()> {
        self.config
            .progress_println("Building and running on macOS...");
        let app = self.build_app(MACOS_DESTINATION)?;

        self.config
            .progress_println(&format!("Launching {}...", self.project.scheme));
        let open = Invocation::new("open").arg(app.display().to_string());
        run_stage(self.toolchain, Stage::Launch.label(), &open)?;
        Ok(())
    }

    fn run_on_simulator(&self, platform: Platform, udid: &str) -> Result<()> {
        self.config
            .progress_println(&format!("Building for {platform} simulator..."));
        let app = self.build_app(&format!("id={udid}"))?;
        let app_arg = app.display().to_string();

        self.config.progress_println("Booting simulator...");
        let boot = Invocation::new("xcrun")
            .args(["simctl", "boot", udid])
            .captured();
        match self.toolchain.run(&boot) {
            Ok(output) if !output.success() => {
                log::debug!("simctl boot: {}", output.stderr.trim());
            }
            Err(e) => log::debug!("simctl boot: {e}"),
            Ok(_) => {}
        }

        self.config.progress_println("Installing app...");
        let install = Invocation::new("xcrun").args(["simctl", "install", udid, app_arg.as_str()]);
        run_stage(self.toolchain, Stage::Install.label(), &install)?;

        let bundle_id = self.bundle_identifier(&app)?;

        self.config.progress_println("Launching app...");
        let launch = Invocation::new("xcrun").args(["simctl", "launch", udid, bundle_id.as_str()]);
        run_stage(self.toolchain, Stage::Launch.label(), &launch)?;

        self.config.success_println("App launched successfully!");
        Ok(())
    }

    fn run_on_device(&self, platform: Platform, udid: &str) -> Result<()> {
        self.config.progress_println(&format!(
            "Building and installing on {platform} device..."
        ));
        let build = self.development_build(&format!("id={udid}"));
        run_stage(self.toolchain, Stage::Build.label(), &build)?;

        self.config
            .success_println("App installed successfully! Launch it manually on your device.");
        Ok(())
    }

    fn bundle_identifier(&self, app: &std::path::Path) -> Result<String> {
        let missing = || StageError::MissingOutput {
            stage: Stage::Launch.label().to_string(),
            reason: "could not determine bundle identifier".to_string(),
        };

        let info_plist = app.join("Info.plist");
        if !info_plist.is_file() {
            return Err(missing().into());
        }

        let read = Invocation::new("defaults")
            .arg("read")
            .arg(info_plist.display().to_string())
            .arg("CFBundleIdentifier")
            .captured();
        let output = self.toolchain.run(&read)?;
        let identifier = output.stdout.trim();
        if !output.success() || identifier.is_empty() {
            return Err(missing().into());
        }
        Ok(identifier.to_string())
    }
}
