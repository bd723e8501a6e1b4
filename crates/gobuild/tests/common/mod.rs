//! Shared test utilities for gobuild integration tests
//!
//! `ScriptedToolchain` answers invocations from canned output so tests never
//! depend on a `go` installation.

#![allow(dead_code)]

use async_trait::async_trait;
use gobuild::{
    BuildSettings, Invocation, Toolchain, ToolchainError, ToolchainResult, ToolchainStream,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

pub const DEFAULT_GOROOT: &str = "/usr/local/go";

#[derive(Debug, Clone)]
enum Response {
    Output(Vec<u8>),
    Failed {
        stdout: Vec<u8>,
        exit_code: i32,
        stderr: String,
    },
}

/// Toolchain double keyed by the invocation's argument line
#[derive(Debug, Default)]
pub struct ScriptedToolchain {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `stdout` for the given argument line.
    pub fn respond(self, args: &str, stdout: impl Into<Vec<u8>>) -> Self {
        self.responses
            .lock()
            .insert(args.to_string(), Response::Output(stdout.into()));
        self
    }

    /// Exit non-zero after printing `stdout`.
    pub fn fail(self, args: &str, stdout: impl Into<Vec<u8>>, exit_code: i32, stderr: &str) -> Self {
        self.responses.lock().insert(
            args.to_string(),
            Response::Failed {
                stdout: stdout.into(),
                exit_code,
                stderr: stderr.to_string(),
            },
        );
        self
    }

    pub fn goroot(self, root: &str) -> Self {
        self.respond("env GOROOT", format!("{root}\n"))
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, args: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|inv| inv.command_line() == args)
            .collect()
    }

    fn lookup(&self, invocation: &Invocation) -> ToolchainResult<Response> {
        self.calls.lock().push(invocation.clone());
        self.responses
            .lock()
            .get(&invocation.command_line())
            .cloned()
            .ok_or_else(|| {
                ToolchainError::spawn_failed(
                    invocation.to_string(),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no scripted response"),
                )
            })
    }
}

#[async_trait]
impl Toolchain for ScriptedToolchain {
    async fn run(&self, invocation: &Invocation) -> ToolchainResult<Vec<u8>> {
        match self.lookup(invocation)? {
            Response::Output(stdout) => Ok(stdout),
            Response::Failed {
                exit_code, stderr, ..
            } => Err(ToolchainError::exit(invocation.to_string(), exit_code, stderr)),
        }
    }

    async fn spawn(&self, invocation: &Invocation) -> ToolchainResult<ToolchainStream> {
        Ok(match self.lookup(invocation)? {
            Response::Output(stdout) => ToolchainStream::from_bytes(stdout, Ok(())),
            Response::Failed {
                stdout,
                exit_code,
                stderr,
            } => ToolchainStream::from_bytes(
                stdout,
                Err(ToolchainError::exit(invocation.to_string(), exit_code, stderr)),
            ),
        })
    }
}

/// Settings template with a fixed GOROOT
pub fn default_settings(goroot: &str) -> BuildSettings {
    let goroot = goroot.to_string();
    BuildSettings::from_lookup(move |key: &str| match key {
        "GOROOT" => Some(goroot.clone()),
        "GOPATH" => Some("/home/gopher/go".to_string()),
        _ => None,
    })
}

/// A fresh project directory
pub fn project_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().expect("temp dir")
}

/// Collects formatted log output written by a scoped subscriber
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.contents().matches(needle).count()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route WARN and above on this thread into a [`LogCapture`] until the guard drops.
pub fn capture_warnings() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::WARN)
        .without_time()
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
