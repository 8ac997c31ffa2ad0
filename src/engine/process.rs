//! Subprocess-backed editing engine.
//!
//! [`ProcessEngine`] drives an external engine CLI: one child process per
//! instruction, launched in the repository root with stdio captured.
//! Stdout is streamed line-by-line into the invocation's [`OutputSink`]
//! (and accumulated as the response text); stderr goes to
//! [`OutputSink::emit_error`]. The child carries `kill_on_drop` so an
//! abandoned invocation never leaks a process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::engine::{BoxFuture, CodeEngine, EngineFactory, EngineSpec, OutputSink};
use crate::{BridgeError, Result};

/// How much trailing stderr to keep for error reporting.
const STDERR_TAIL_LINES: usize = 20;

/// Launch configuration shared by every [`ProcessEngine`] instance.
#[derive(Debug, Clone)]
pub struct ProcessEngineConfig {
    /// Engine CLI binary.
    pub program: String,
    /// Arguments prepended before the per-invocation flags.
    pub args: Vec<String>,
    /// The engine's own bound on one invocation; `None` means unbounded.
    pub timeout: Option<Duration>,
}

/// Factory producing [`ProcessEngine`] handles.
///
/// The model identifier from the spec is forwarded to the CLI untouched;
/// hosts that need provider-prefixed identifiers must send them already
/// normalized.
#[derive(Debug, Clone)]
pub struct ProcessEngineFactory {
    config: ProcessEngineConfig,
}

impl ProcessEngineFactory {
    /// Factory over the given launch configuration.
    #[must_use]
    pub fn new(config: ProcessEngineConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for ProcessEngineFactory {
    fn create(&self, spec: &EngineSpec) -> Result<Box<dyn CodeEngine>> {
        if self.config.program.trim().is_empty() {
            return Err(BridgeError::Engine(
                "engine program is not configured".into(),
            ));
        }

        Ok(Box::new(ProcessEngine {
            config: self.config.clone(),
            spec: spec.clone(),
            test_command: None,
            lint_command: None,
        }))
    }
}

/// One bound engine handle; see the module docs for the process contract.
#[derive(Debug)]
pub struct ProcessEngine {
    config: ProcessEngineConfig,
    spec: EngineSpec,
    test_command: Option<String>,
    lint_command: Option<String>,
}

impl ProcessEngine {
    fn build_command(&self, instruction: &str, files: &[PathBuf]) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args);
        cmd.arg("--model").arg(&self.spec.model);
        cmd.arg(if self.spec.auto_commits {
            "--auto-commits"
        } else {
            "--no-auto-commits"
        });
        cmd.arg(if self.spec.dirty_commits {
            "--dirty-commits"
        } else {
            "--no-dirty-commits"
        });
        if let Some(format) = &self.spec.edit_format {
            cmd.arg("--edit-format").arg(format);
        }
        if let Some(test_cmd) = &self.test_command {
            cmd.arg("--test-cmd").arg(test_cmd);
        }
        if let Some(lint_cmd) = &self.lint_command {
            cmd.arg("--lint-cmd").arg(lint_cmd);
        }
        cmd.arg("--message").arg(instruction);
        for file in files {
            cmd.arg(file);
        }

        cmd.current_dir(&self.spec.repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run_once(
        &self,
        instruction: &str,
        files: &[PathBuf],
        sink: &mut dyn OutputSink,
    ) -> Result<String> {
        let mut child = self
            .build_command(instruction, files)
            .spawn()
            .map_err(|err| {
                BridgeError::Engine(format!(
                    "failed to launch engine '{}': {err}",
                    self.config.program
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Engine("failed to capture engine stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BridgeError::Engine("failed to capture engine stderr".into()))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut response = String::new();
        let mut stderr_tail: Vec<String> = Vec::new();
        let mut out_done = false;
        let mut err_done = false;

        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_line(), if !out_done => match line {
                    Ok(Some(text)) => {
                        sink.emit_output(&text);
                        response.push_str(&text);
                        response.push('\n');
                    }
                    Ok(None) => out_done = true,
                    Err(err) => {
                        return Err(BridgeError::Engine(format!(
                            "engine stdout read failed: {err}"
                        )));
                    }
                },
                line = err_lines.next_line(), if !err_done => match line {
                    Ok(Some(text)) => {
                        sink.emit_error(&text);
                        if stderr_tail.len() == STDERR_TAIL_LINES {
                            stderr_tail.remove(0);
                        }
                        stderr_tail.push(text);
                    }
                    Ok(None) => err_done = true,
                    Err(err) => {
                        warn!(%err, "engine stderr read failed; continuing without it");
                        err_done = true;
                    }
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|err| BridgeError::Engine(format!("engine wait failed: {err}")))?;

        if status.success() {
            debug!(bytes = response.len(), "engine invocation complete");
            Ok(response.trim_end().to_owned())
        } else {
            Err(BridgeError::Engine(format!(
                "engine exited with {status}: {}",
                stderr_tail.join(" | ")
            )))
        }
    }
}

impl CodeEngine for ProcessEngine {
    fn run<'a>(
        &'a mut self,
        instruction: &'a str,
        files: &'a [PathBuf],
        sink: &'a mut dyn OutputSink,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            match self.config.timeout {
                // Dropping the timed-out future drops the child, and
                // kill_on_drop reaps it.
                Some(bound) => tokio::time::timeout(bound, self.run_once(instruction, files, sink))
                    .await
                    .map_err(|_| {
                        BridgeError::Timeout(format!(
                            "engine run exceeded {}s",
                            bound.as_secs()
                        ))
                    })?,
                None => self.run_once(instruction, files, sink).await,
            }
        })
    }

    fn set_test_command(&mut self, command: &str) {
        self.test_command = Some(command.to_owned());
    }

    fn set_lint_command(&mut self, command: &str) {
        self.lint_command = Some(command.to_owned());
    }
}
