//! Command execution boundary. The orchestrator only depends on "command in,
//! text out, or failure"; the default implementation hands rendered text to a
//! host shell, while tests substitute scripted executors.

use crate::cluster::docker;
use crate::plan::command::Command;
use anyhow::{bail, Context, Result};
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::time::sleep;

/// Captured output of one executed command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes a single command against the host or a named node's execution
/// context.
pub trait CommandExecutor: Send + Sync {
    fn run<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<CommandOutput>>;
}

/// Runs rendered commands through a host shell. Settle barriers are honoured
/// in-process rather than shelled out, so waits stay accurate under load.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: PathBuf,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
        }
    }

    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for ShellExecutor {
    fn run<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            if let Command::Settle { duration } = command {
                tracing::debug!(seconds = duration.as_secs_f64(), "settle wait");
                sleep(*duration).await;
                return Ok(CommandOutput::default());
            }

            let rendered = docker::render(command);
            tracing::debug!(command = %rendered, "issuing command");

            let output = tokio::process::Command::new(&self.shell)
                .arg("-c")
                .arg(&rendered)
                .stdin(Stdio::null())
                .output()
                .await
                .with_context(|| format!("failed to spawn shell for: {rendered}"))?;

            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if !output.status.success() {
                bail!(
                    "command exited with {}: {rendered} ({})",
                    output.status,
                    stderr.trim()
                );
            }
            Ok(CommandOutput { stdout, stderr })
        })
    }
}
