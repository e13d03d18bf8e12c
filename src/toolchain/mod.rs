//! External toolchain invocation.
//!
//! All calls to `xcodebuild`, `xcrun` and friends go through the [`Toolchain`]
//! trait so the pipeline can be driven against a scripted toolchain in tests.
//! Invocations block until the child exits; no timeout is applied.

use std::process::{Command, Stdio};

use crate::error::{Result, StageError};

/// A single external command: program plus argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name, resolved on PATH
    pub program: String,
    /// Arguments, passed verbatim
    pub args: Vec<String>,
    /// Capture stdout/stderr instead of streaming them to the terminal
    pub capture: bool,
}

impl Invocation {
    /// Start an invocation of `program` whose output streams to the terminal
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            capture: false,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Capture output so the caller can parse it
    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Command line for diagnostics
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push_str(&format!("{arg:?}"));
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    /// Whether `needle` appears among the arguments
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }

    /// Value following `flag`, if present
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

/// Outcome of a finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    /// Captured stdout (empty for streamed invocations)
    pub stdout: String,
    /// Captured stderr (empty for streamed invocations)
    pub stderr: String,
}

impl ToolOutput {
    /// Successful exit with the given stdout
    pub fn success_with(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed exit with the given code and stderr
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    fn status_label(&self) -> String {
        match self.status {
            Some(code) => format!("exit status: {code}"),
            None => "a signal".to_string(),
        }
    }

    fn diagnostic(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else {
            self.stderr.clone()
        }
    }
}

/// Runs external commands.
pub trait Toolchain {
    /// Run the invocation to completion.
    ///
    /// Returns `Err` only when the process could not be started; a non-zero
    /// exit is reported through [`ToolOutput::status`].
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// Run `invocation` as part of `stage`, turning a non-zero exit into a [`StageError`].
pub fn run_stage(toolchain: &dyn Toolchain, stage: &str, invocation: &Invocation) -> Result<ToolOutput> {
    let output = toolchain.run(invocation)?;
    if output.success() {
        return Ok(output);
    }

    Err(StageError::CommandFailed {
        stage: stage.to_string(),
        command: invocation.command_line(),
        status: output.status_label(),
        diagnostic: output.diagnostic(),
    }
    .into())
}

/// Toolchain backed by real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemToolchain;

impl SystemToolchain {
    /// Create a system toolchain
    pub fn new() -> Self {
        Self
    }
}

impl Toolchain for SystemToolchain {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let program = which::which(&invocation.program).map_err(|_| StageError::ToolMissing {
            program: invocation.program.clone(),
        })?;

        log::debug!("Running {}", invocation.command_line());

        let mut command = Command::new(program);
        command.args(&invocation.args).stdin(Stdio::inherit());

        let spawn_failed = |source| StageError::SpawnFailed {
            command: invocation.command_line(),
            source,
        };

        if invocation.capture {
            let output = command.output().map_err(spawn_failed)?;
            Ok(ToolOutput {
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        } else {
            let status = command
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(spawn_failed)?;
            Ok(ToolOutput {
                status: status.code(),
                ..ToolOutput::default()
            })
        }
    }
}
