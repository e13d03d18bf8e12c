//! Everything a command needs, resolved once per invocation.

use std::path::PathBuf;

use crate::cli::{Args, RuntimeConfig};
use crate::config::ProjectConfig;
use crate::credentials::{ProcessEnv, load_env_file};
use crate::device::{DeviceCatalog, DeviceSelector, StdinPrompt};
use crate::error::Result;
use crate::pipeline::PipelineRunner;
use crate::state::PreferenceStore;
use crate::toolchain::SystemToolchain;

/// Owned dependencies for one command invocation
pub(super) struct CommandContext {
    /// Runtime configuration for output
    pub config: RuntimeConfig,
    /// Resolved project settings
    pub project: ProjectConfig,
    toolchain: SystemToolchain,
    env: ProcessEnv,
    store: PreferenceStore,
    prompt: StdinPrompt,
}

impl CommandContext {
    /// Resolve the project against the current directory.
    pub fn from_args(args: &Args, config: RuntimeConfig) -> Result<Self> {
        let working_dir = std::env::current_dir()?;
        let project = ProjectConfig::resolve(
            args.scheme.clone(),
            &args.project,
            args.devices_file.as_deref(),
            args.export_options_dir.as_deref(),
            &working_dir,
        );

        let store = PreferenceStore::load(&project.devices_file);

        Ok(Self {
            config,
            project,
            toolchain: SystemToolchain::new(),
            env: ProcessEnv,
            store,
            prompt: StdinPrompt,
        })
    }

    /// Load the project's `.env` into the process environment.
    ///
    /// Only the stages that pass App Store Connect credentials need it.
    pub fn load_env(&self) -> Result<()> {
        if let Some(loaded) = load_env_file(&self.project.env_file_candidates())? {
            self.config
                .verbose_println(&format!("Loaded environment from {}", loaded.display()));
        }
        Ok(())
    }

    /// Runner for stages that need no device
    pub fn runner(&self) -> PipelineRunner<'_> {
        PipelineRunner::new(&self.toolchain, &self.config, &self.project, &self.env)
    }

    /// Runner plus a device selector backed by the saved preferences
    pub fn runner_with_selector(&mut self) -> (PipelineRunner<'_>, DeviceSelector<'_>) {
        let runner = PipelineRunner::new(&self.toolchain, &self.config, &self.project, &self.env);
        let selector = DeviceSelector::new(
            DeviceCatalog::new(&self.toolchain),
            &mut self.store,
            &mut self.prompt,
            &self.config,
        );
        (runner, selector)
    }

    /// Catalog over the system toolchain
    pub fn catalog(&self) -> DeviceCatalog<'_> {
        DeviceCatalog::new(&self.toolchain)
    }

    /// Resolve a user-supplied path against the working directory
    pub fn resolve_path(&self, path: &std::path::Path) -> PathBuf {
        let expanded = crate::config::expand_home(&path.to_string_lossy());
        if expanded.is_absolute() {
            expanded
        } else {
            self.project.working_dir.join(expanded)
        }
    }
}
