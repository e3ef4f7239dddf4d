//! Running external tools.

use crate::errors::{AssetflowError, CompileError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A fully resolved external tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// The stage that issued the call.
    pub stage: String,
    /// Program name or path.
    pub program: String,
    /// Arguments after placeholder substitution.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: PathBuf,
    /// Input files, absolute.
    pub inputs: Vec<PathBuf>,
    /// Declared output, absolute.
    pub output: Option<PathBuf>,
}

impl ToolInvocation {
    /// The command line as a single string, for logs.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a finished tool wrote and how it exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code, `None` if terminated by a signal.
    pub exit_code: Option<i32>,
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Standard error as text.
    pub stderr: String,
}

impl CapturedOutput {
    /// A successful run with the given standard output.
    #[must_use]
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given exit code and standard error.
    #[must_use]
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// The tool's diagnostic: standard error, or standard output when stderr is empty.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        if self.stderr.trim().is_empty() {
            String::from_utf8_lossy(&self.stdout).into_owned()
        } else {
            self.stderr.clone()
        }
    }
}

/// Executes tool invocations.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs the invocation to completion.
    ///
    /// A non-zero exit is reported through [`CapturedOutput::success`], not as
    /// an error. Errors are reserved for processes that cannot be started.
    async fn run(&self, invocation: &ToolInvocation) -> Result<CapturedOutput, AssetflowError>;
}

/// Runs tools as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<CapturedOutput, AssetflowError> {
        debug!(
            stage = %invocation.stage,
            cwd = %invocation.cwd.display(),
            command = %invocation.command_line(),
            "Invoking tool"
        );

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                CompileError::new(
                    &invocation.stage,
                    &invocation.program,
                    None,
                    format!("failed to start `{}`: {err}", invocation.program),
                )
            })?;

        Ok(CapturedOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(program: &str, args: &[&str]) -> ToolInvocation {
        ToolInvocation {
            stage: "test".to_string(),
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            cwd: std::env::temp_dir(),
            inputs: Vec::new(),
            output: None,
        }
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let mut out = CapturedOutput::failed(1, "Error: bad token");
        out.stdout = b"progress".to_vec();
        assert_eq!(out.diagnostic(), "Error: bad token");

        let out = CapturedOutput {
            success: false,
            exit_code: Some(2),
            stdout: b"only stdout".to_vec(),
            stderr: "  \n".to_string(),
        };
        assert_eq!(out.diagnostic(), "only stdout");
    }

    #[test]
    fn test_command_line() {
        assert_eq!(invocation("sass", &["a.sass", "a.css"]).command_line(), "sass a.sass a.css");
    }

    #[tokio::test]
    async fn test_missing_program_is_compile_error() {
        let err = ProcessRunner
            .run(&invocation("assetflow-no-such-program", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "compile");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_exit_and_streams() {
        let out = ProcessRunner
            .run(&invocation("sh", &["-c", "printf out; printf err >&2; exit 3"]))
            .await
            .unwrap();

        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout, b"out");
        assert_eq!(out.stderr, "err");
    }
}
