use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::error::VaultkeepError;

/// Upper bound on how much of a hook's stdout is retained for directive parsing, so a runaway
/// or chatty child process can't grow the driver's memory use without limit.
const STDOUT_CAPTURE_LIMIT_BYTES: usize = 1024 * 1024;

/// A single hook invocation: the shell command line plus the environment variables the driver
/// injects (snapshot id, source path, event name, and so on).
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub command: String,
    pub env: Vec<(String, String)>,
}

impl ProcessSpec {
    pub fn new(command: impl Into<String>) -> Self {
        ProcessSpec {
            command: command.into(),
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// The raw result of running a hook to completion, before mode-specific interpretation
/// (essential/optional/asynchronous) is applied by the caller.
#[derive(Debug, Clone)]
pub struct RawOutcome {
    pub exit_ok: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
}

/// Abstracts subprocess execution so the hook runner can be driven by a fake in tests without
/// ever spawning a real shell. Mirrors the shape of a real process: run-to-completion-or-timeout,
/// or spawn-and-forget.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: ProcessSpec, timeout: Duration) -> Result<RawOutcome, VaultkeepError>;

    async fn spawn_detached(&self, spec: ProcessSpec) -> Result<(), VaultkeepError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: ProcessSpec, timeout: Duration) -> Result<RawOutcome, VaultkeepError> {
        let mut command = build_command(&spec, true);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::null());

        let mut child = command.spawn().map_err(|source| VaultkeepError::HookSpawnFailed {
            command: spec.command.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let reader_task = stdout.map(|stdout| {
            tokio::spawn(async move {
                // Keeps draining the pipe even once the cap is hit so a chatty child never
                // blocks on a full stdout buffer; only the lines within the cap are kept.
                let mut lines = Vec::new();
                let mut captured_bytes = 0usize;
                let mut reader = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    captured_bytes += line.len() + 1;
                    if captured_bytes <= STDOUT_CAPTURE_LIMIT_BYTES {
                        lines.push(line);
                    }
                }
                lines
            })
        });

        let wait_result = tokio::time::timeout(timeout, child.wait()).await;

        let status = match wait_result {
            Ok(status) => status.map_err(|source| VaultkeepError::HookSpawnFailed {
                command: spec.command.clone(),
                source,
            })?,
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(VaultkeepError::HookTimeout {
                    command: spec.command,
                    timeout,
                });
            }
        };

        let stdout = match reader_task {
            Some(task) => task.await.unwrap_or_default().join("\n"),
            None => String::new(),
        };

        Ok(RawOutcome {
            exit_ok: status.success(),
            exit_code: status.code(),
            stdout,
        })
    }

    async fn spawn_detached(&self, spec: ProcessSpec) -> Result<(), VaultkeepError> {
        let mut command = build_command(&spec, false);
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
        let child = command.spawn().map_err(|source| VaultkeepError::HookSpawnFailed {
            command: spec.command,
            source,
        })?;

        // Owns the child in its own task so it isn't killed when this function returns; the
        // task just reaps it to avoid leaving a zombie once the process exits on its own.
        tokio::spawn(async move {
            let mut child = child;
            let _ = child.wait().await;
        });
        Ok(())
    }
}

fn build_command(spec: &ProcessSpec, kill_on_drop: bool) -> Command {
    let mut command = Command::new("/bin/sh");
    command.arg("-c").arg(&spec.command);
    for (key, value) in &spec.env {
        command.env(key, value);
    }
    command.kill_on_drop(kill_on_drop);
    command
}
