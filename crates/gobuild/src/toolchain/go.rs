//! Process-backed toolchain that shells out to the `go` binary

use async_trait::async_trait;
use gobuild_config::ToolchainConfig;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::debug;

use super::{Invocation, Toolchain, ToolchainStream};
use crate::error::{ToolchainError, ToolchainResult};

/// Runs invocations against a real `go` installation
///
/// Every child is spawned with `kill_on_drop`, so dropping the future of a
/// pending call (or hitting the deadline) terminates the process.
#[derive(Debug, Clone)]
pub struct GoCommand {
    /// Binary to execute
    binary: PathBuf,

    /// Deadline for a single invocation
    timeout: Duration,

    /// Cap on stdout read by [`Toolchain::run`]
    max_output_bytes: usize,

    /// Environment applied before per-invocation overrides
    env: Vec<(String, String)>,
}

impl Default for GoCommand {
    fn default() -> Self {
        Self::from_config(&ToolchainConfig::default())
    }
}

impl GoCommand {
    /// Use `go` from `PATH` with default limits
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self {
            binary: config.go.clone(),
            timeout: config.timeout(),
            max_output_bytes: config.max_output_bytes,
            env: config
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Use a specific binary
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap on stdout read by [`Toolchain::run`]
    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&invocation.args)
            .current_dir(&invocation.dir)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn timeout_error(&self, invocation: &Invocation) -> ToolchainError {
        ToolchainError::timeout(invocation.to_string(), self.timeout)
    }
}

/// Drain stderr alongside stdout so a chatty toolchain can't fill the pipe.
fn drain_stderr(child: &mut Child) -> Option<JoinHandle<Vec<u8>>> {
    child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        })
    })
}

async fn collect_stderr(task: Option<JoinHandle<Vec<u8>>>) -> String {
    let stderr = match task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };
    String::from_utf8_lossy(&stderr).trim().to_string()
}

fn take_stdout(child: &mut Child, command_line: &str) -> ToolchainResult<ChildStdout> {
    child.stdout.take().ok_or_else(|| {
        ToolchainError::io(
            command_line,
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "failed to capture stdout"),
        )
    })
}

#[async_trait]
impl Toolchain for GoCommand {
    /// Stdout is read up to `max_output_bytes`; past that the child is
    /// killed and nothing more is buffered.
    async fn run(&self, invocation: &Invocation) -> ToolchainResult<Vec<u8>> {
        let command_line = invocation.to_string();
        debug!(command = %command_line, dir = %invocation.dir.display(), "running toolchain");

        let deadline = Instant::now() + self.timeout;
        let mut child = self
            .command(invocation)
            .spawn()
            .map_err(|e| ToolchainError::spawn_failed(&command_line, e))?;
        let mut stdout = take_stdout(&mut child, &command_line)?;
        let stderr_task = drain_stderr(&mut child);

        let limit = self.max_output_bytes;
        let mut output = Vec::new();
        timeout_at(
            deadline,
            (&mut stdout)
                .take(limit as u64 + 1)
                .read_to_end(&mut output),
        )
        .await
        .map_err(|_| self.timeout_error(invocation))?
        .map_err(|e| ToolchainError::io(&command_line, e))?;

        if output.len() > limit {
            return Err(ToolchainError::output_too_large(command_line, limit));
        }
        drop(stdout);

        let status = timeout_at(deadline, child.wait())
            .await
            .map_err(|_| self.timeout_error(invocation))?
            .map_err(|e| ToolchainError::io(&command_line, e))?;

        if !status.success() {
            let stderr = collect_stderr(stderr_task).await;
            let exit_code = status.code().unwrap_or(-1);
            return Err(ToolchainError::exit(command_line, exit_code, stderr));
        }

        Ok(output)
    }

    async fn spawn(&self, invocation: &Invocation) -> ToolchainResult<ToolchainStream> {
        let command_line = invocation.to_string();
        debug!(command = %command_line, dir = %invocation.dir.display(), "streaming toolchain");

        let mut child = self
            .command(invocation)
            .spawn()
            .map_err(|e| ToolchainError::spawn_failed(&command_line, e))?;
        let stdout = take_stdout(&mut child, &command_line)?;
        let stderr_task = drain_stderr(&mut child);

        let deadline = self.timeout;
        let timeout_err = self.timeout_error(invocation);
        let exit = async move {
            let status = timeout(deadline, child.wait())
                .await
                .map_err(|_| timeout_err)?
                .map_err(|e| ToolchainError::io(&command_line, e))?;

            if status.success() {
                Ok(())
            } else {
                let stderr = collect_stderr(stderr_task).await;
                Err(ToolchainError::exit(
                    command_line,
                    status.code().unwrap_or(-1),
                    stderr,
                ))
            }
        };

        Ok(ToolchainStream::new(Box::pin(stdout), Box::pin(exit)))
    }
}
