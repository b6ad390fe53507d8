//! Process execution for the external retrieval tools
//!
//! Runs a program to completion, captures stdout/stderr as text and returns the exit
//! code. No retries here; the caller decides the timeout and what a failure means.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::core::utils::truncate_tail_utf8;
use crate::download::error::DownloadError;

/// One invocation of an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Kill the child and fail once this elapses
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Binary name without directories, used in logs and error messages.
    pub fn tool_name(&self) -> String {
        std::path::Path::new(&self.program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; -1 when the process was terminated by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Full failure text: stderr if present, else stdout.
    pub fn failure_text(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }

    /// [`failure_text`](Self::failure_text) bounded to the last `max_chars`, for the user.
    pub fn diagnostic_tail(&self, max_chars: usize) -> String {
        truncate_tail_utf8(self.failure_text(), max_chars).to_string()
    }
}

/// Seam over process spawning so the planner and executor can be driven by fakes in tests.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, DownloadError>;
}

/// Real runner backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, DownloadError> {
        let tool = spec.tool_name();
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::debug!("PROCESS | spawn | {} {}", spec.program, spec.args.join(" "));

        let output = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    // Dropping the output future drops the child, which kills it.
                    log::error!("PROCESS | {} timed out after {}s, killed", tool, limit.as_secs());
                    return Err(DownloadError::Timeout {
                        tool,
                        secs: limit.as_secs(),
                    });
                }
            },
            None => cmd.output().await,
        }
        .map_err(|source| DownloadError::Spawn { tool, source })?;

        Ok(ProcessOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: decode_lossy(&output.stdout),
            stderr: decode_lossy(&output.stderr),
        })
    }
}

/// Decodes tool output as UTF-8, dropping invalid byte sequences instead of failing.
pub fn decode_lossy(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
