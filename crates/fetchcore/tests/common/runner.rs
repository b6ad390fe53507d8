//! Scripted process runner that fakes yt-dlp and gallery-dl.

#![allow(dead_code)]

use async_trait::async_trait;
use fetchcore::core::process::{CommandSpec, ProcessOutput, ProcessRunner};
use fetchcore::download::DownloadError;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

/// What the next tool invocation does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Exit 0 printing `stdout`
    Stdout(String),
    /// Exit 0 after writing files of the given sizes.
    ///
    /// For yt-dlp the names are appended to the `-o` template prefix (`<job>.`); for
    /// gallery-dl they are relative to the `-d` directory and may contain subdirectories.
    Files(Vec<(String, usize)>),
    /// Non-zero exit with this stderr
    Fail { code: i32, stderr: String },
    /// Behave like a killed, hung tool
    Timeout,
}

/// Runner that replays [`Step`]s in order and records every invocation.
///
/// `--version` calls are answered directly and do not consume a step.
#[derive(Default)]
pub struct FakeRunner {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocations other than `--version` checks.
    pub fn tool_calls(&self) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.args != ["--version"])
            .collect()
    }

    pub fn remaining_steps(&self) -> usize {
        self.steps.lock().unwrap().len()
    }

    fn value_after(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
    }

    fn materialize(spec: &CommandSpec, files: &[(String, usize)]) {
        if let Some(template) = Self::value_after(&spec.args, "-o") {
            let prefix = template.split("%(").next().unwrap().to_string();
            for (name, size) in files {
                let path = PathBuf::from(format!("{}{}", prefix, name));
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(&path, vec![0u8; *size]).unwrap();
            }
        } else if let Some(dir) = Self::value_after(&spec.args, "-d") {
            for (name, size) in files {
                let path = PathBuf::from(&dir).join(name);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(&path, vec![0u8; *size]).unwrap();
            }
        } else {
            panic!("Files step for a command without -o or -d: {:?}", spec.args);
        }
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, DownloadError> {
        self.calls.lock().unwrap().push(spec.clone());

        if spec.args == ["--version"] {
            return Ok(ProcessOutput {
                code: 0,
                stdout: "2025.01.01\n".into(),
                stderr: String::new(),
            });
        }

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected invocation: {} {:?}", spec.program, spec.args));

        match step {
            Step::Stdout(stdout) => Ok(ProcessOutput {
                code: 0,
                stdout,
                stderr: String::new(),
            }),
            Step::Files(files) => {
                Self::materialize(spec, &files);
                Ok(ProcessOutput::default())
            }
            Step::Fail { code, stderr } => Ok(ProcessOutput {
                code,
                stdout: String::new(),
                stderr,
            }),
            Step::Timeout => Err(DownloadError::Timeout {
                tool: spec.tool_name(),
                secs: 1,
            }),
        }
    }
}
