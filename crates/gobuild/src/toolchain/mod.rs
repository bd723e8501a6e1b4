//! External toolchain abstraction
//!
//! This module defines the `Toolchain` trait that every resolution step goes
//! through to reach the `go` binary. `GoCommand` is the process-backed
//! implementation; tests substitute scripted toolchains that answer from
//! canned output without spawning anything.

mod go;

pub use go::GoCommand;

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::AsyncRead;

use crate::error::ToolchainResult;

/// One external command: arguments to the toolchain binary, the directory it
/// runs in, and environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub dir: PathBuf,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new<I, S>(dir: impl AsRef<Path>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            dir: dir.as_ref().to_path_buf(),
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, env: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(env);
        self
    }

    /// `go env GOROOT`
    pub fn env_goroot(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, ["env", "GOROOT"])
    }

    /// `go list -mod=readonly -json -m all`
    pub fn list_modules(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, ["list", "-mod=readonly", "-json", "-m", "all"])
    }

    /// Name-only package load: `go list -find -json <pattern>`
    pub fn find_packages(dir: impl AsRef<Path>, pattern: &str) -> Self {
        Self::new(dir, ["list", "-find", "-json", "--", pattern])
    }

    /// Package load with errors reported in-band: `go list -e -json [-find] [-tags t] <path>`
    pub fn import_package(
        dir: impl AsRef<Path>,
        path: &str,
        build_tags: &[String],
        find_only: bool,
    ) -> Self {
        let mut args = vec!["list".to_string(), "-e".to_string(), "-json".to_string()];
        if find_only {
            args.push("-find".to_string());
        }
        if !build_tags.is_empty() {
            args.push(format!("-tags={}", build_tags.join(",")));
        }
        args.push("--".to_string());
        args.push(path.to_string());
        Self::new(dir, args)
    }

    /// Arguments joined by spaces, used as a lookup key and in messages
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "go {}", self.command_line())
    }
}

/// Completion half of a streamed invocation
pub type ExitFuture = Pin<Box<dyn Future<Output = ToolchainResult<()>> + Send>>;

/// A running invocation whose stdout is consumed incrementally
pub struct ToolchainStream {
    /// Standard output, read as it is produced
    pub stdout: Pin<Box<dyn AsyncRead + Send>>,
    exit: ExitFuture,
}

impl ToolchainStream {
    pub fn new(stdout: Pin<Box<dyn AsyncRead + Send>>, exit: ExitFuture) -> Self {
        Self { stdout, exit }
    }

    /// Stream fixed bytes and report the given exit result
    pub fn from_bytes(bytes: Vec<u8>, exit: ToolchainResult<()>) -> Self {
        Self {
            stdout: Box::pin(std::io::Cursor::new(bytes)),
            exit: Box::pin(async move { exit }),
        }
    }

    /// Wait for the process to exit once stdout has been consumed.
    pub async fn finish(self) -> ToolchainResult<()> {
        drop(self.stdout);
        self.exit.await
    }
}

impl fmt::Debug for ToolchainStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolchainStream").finish_non_exhaustive()
    }
}

/// Access to the external toolchain
///
/// Implementations must be safe to share across tasks; a single toolchain
/// instance serves every build context created from it.
#[async_trait]
pub trait Toolchain: Send + Sync + fmt::Debug {
    /// Run to completion and return stdout.
    ///
    /// A non-zero exit is reported as [`crate::ToolchainError::Exit`].
    async fn run(&self, invocation: &Invocation) -> ToolchainResult<Vec<u8>>;

    /// Start the invocation and hand back its stdout as a stream.
    ///
    /// The exit status is only known after [`ToolchainStream::finish`].
    async fn spawn(&self, invocation: &Invocation) -> ToolchainResult<ToolchainStream>;
}
