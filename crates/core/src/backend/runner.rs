//! Process launching.

use super::{ToolError, ToolResult};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A fully rendered external command: program plus argument vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolInvocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends `--name=value`, the flag form the pipeline-suite scripts parse.
    pub fn flag(self, name: &str, value: impl AsRef<OsStr>) -> Self {
        let mut flag = OsString::from(format!("--{name}="));
        flag.push(value.as_ref());
        self.arg(flag)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Executable file name, used to label errors and log lines.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs rendered invocations to completion.
pub trait CommandRunner {
    fn run(&self, invocation: &ToolInvocation) -> ToolResult<()>;
}

/// Spawns real processes, inheriting stdio so tool diagnostics reach the user.
///
/// There is no timeout: a tool that hangs blocks the run.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> ToolResult<()> {
        tracing::debug!("exec: {}", invocation);

        let status = Command::new(invocation.program())
            .args(invocation.args())
            .status()
            .map_err(|source| ToolError::Spawn {
                program: invocation.program_name(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed {
                program: invocation.program_name(),
                code: status.code(),
            })
        }
    }
}
