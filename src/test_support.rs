//! Scripted toolchain, prompt and project fixture for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use crate::cli::RuntimeConfig;
use crate::config::ProjectConfig;
use crate::device::Prompt;
use crate::error::Result;
use crate::pipeline::PipelineRunner;
use crate::platform::Platform;
use crate::state::PreferenceStore;
use crate::toolchain::{Invocation, ToolOutput, Toolchain};

type Responder = Box<dyn Fn(&Invocation) -> ToolOutput>;

/// Records every invocation and answers with a caller-supplied closure.
pub struct ScriptedToolchain {
    responder: Responder,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedToolchain {
    pub fn new(responder: impl Fn(&Invocation) -> ToolOutput + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Toolchain on which every command succeeds with no output
    pub fn succeeding() -> Self {
        Self::new(|_| ToolOutput::success_with(""))
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }
}

impl Toolchain for ScriptedToolchain {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        Ok((self.responder)(invocation))
    }
}

/// Prompt that answers from a fixed script and records every question.
pub struct ScriptedPrompt {
    interactive: bool,
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn interactive(answers: &[&str]) -> Self {
        Self {
            interactive: true,
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }

    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            answers: VecDeque::new(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompt for ScriptedPrompt {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn read_line(&mut self, message: &str) -> Option<String> {
        self.asked.push(message.to_string());
        self.answers.pop_front()
    }
}

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 2)
        .and_then(|d| d.and_hms_opt(3, 4, 5))
        .expect("valid fixed time")
}

/// Temporary project root with export options in `misc/`, a quiet output
/// configuration and an in-memory environment.
pub struct TestProject {
    dir: TempDir,
    pub project: ProjectConfig,
    pub config: RuntimeConfig,
    pub env: HashMap<String, String>,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let project = ProjectConfig::resolve(
            "KMReader",
            &dir.path().join("KMReader.xcodeproj"),
            None,
            None,
            dir.path(),
        );

        let misc = dir.path().join("misc");
        fs::create_dir_all(&misc).expect("create misc");
        fs::write(project.default_export_options(), "<plist/>").expect("write plist");
        for platform in Platform::ALL {
            fs::write(project.platform_export_options(platform), "<plist/>").expect("write plist");
        }

        Self {
            dir,
            project,
            config: RuntimeConfig::new(false, true),
            env: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn set_env(&mut self, key: &str, value: &str) {
        self.env.insert(key.to_string(), value.to_string());
    }

    pub fn store(&self) -> PreferenceStore {
        PreferenceStore::load(&self.project.devices_file)
    }

    pub fn runner<'a>(&'a self, toolchain: &'a dyn Toolchain) -> PipelineRunner<'a> {
        PipelineRunner::new(toolchain, &self.config, &self.project, &self.env).with_clock(fixed_clock)
    }

    /// Create an empty `.xcarchive` directory under `archives/`
    pub fn make_archive(&self, name: &str) -> PathBuf {
        let path = self.root().join("archives").join(name);
        fs::create_dir_all(&path).expect("create archive");
        path
    }

    /// Create a small file at `relative`, with parent directories
    pub fn write_file(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, b"artifact").expect("write file");
        path
    }

    /// Populate the `-exportPath` of an export invocation with `files`
    pub fn write_export(invocation: &Invocation, files: &[&str]) {
        let Some(export_path) = invocation.arg_after("-exportPath") else {
            return;
        };
        let export_path = Path::new(export_path);
        fs::create_dir_all(export_path).expect("create export dir");
        for file in files {
            fs::write(export_path.join(file), b"artifact").expect("write artifact");
        }
    }
}
