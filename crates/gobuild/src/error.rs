//! Error types for toolchain invocation and build-environment resolution

use miette::Diagnostic;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type ToolchainResult<T> = Result<T, ToolchainError>;

/// Errors raised while invoking the external `go` toolchain
#[derive(Error, Debug, Diagnostic)]
pub enum ToolchainError {
    /// The process could not be started
    #[error("failed to run `{command}`: {source}")]
    #[diagnostic(
        code(gobuild::toolchain::spawn_failed),
        help("Check that the go toolchain is installed and available in your PATH")
    )]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited with a non-zero status
    #[error("`{command}` exited with code {exit_code}")]
    #[diagnostic(code(gobuild::toolchain::exit_error))]
    Exit {
        command: String,
        exit_code: i32,
        #[help]
        stderr: String,
    },

    /// Reading the process output failed
    #[error("failed to read output of `{command}`: {source}")]
    #[diagnostic(code(gobuild::toolchain::io))]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Output exceeded the configured cap; reading stopped at the cap
    #[error("output of `{command}` exceeded {max_bytes} bytes")]
    #[diagnostic(
        code(gobuild::toolchain::output_too_large),
        help("Raise `max_output_bytes` in gobuild.toml")
    )]
    OutputTooLarge {
        command: String,
        max_bytes: usize,
    },

    /// The process did not finish before the deadline
    #[error("`{command}` timed out after {timeout:?}")]
    #[diagnostic(
        code(gobuild::toolchain::timeout),
        help("Increase `timeout_secs` or check whether the toolchain is waiting on the network")
    )]
    Timeout { command: String, timeout: Duration },
}

impl ToolchainError {
    pub fn spawn_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            command: command.into(),
            source,
        }
    }

    pub fn exit(command: impl Into<String>, exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::Exit {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn io(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            command: command.into(),
            source,
        }
    }

    pub fn output_too_large(command: impl Into<String>, max_bytes: usize) -> Self {
        Self::OutputTooLarge {
            command: command.into(),
            max_bytes,
        }
    }

    pub fn timeout(command: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            command: command.into(),
            timeout,
        }
    }
}

/// Errors that prevent a build context from being constructed
#[derive(Error, Debug, Diagnostic)]
pub enum BuildError {
    /// The working directory could not be made absolute
    #[error("cannot resolve working directory {dir}: {source}")]
    #[diagnostic(code(gobuild::context::working_dir))]
    WorkingDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(gobuild::context::config))]
    Config(#[from] gobuild_config::ConfigError),
}

/// Errors returned by module graph resolution
#[derive(Error, Debug, Diagnostic)]
pub enum ModuleError {
    /// A record in the listing stream was malformed
    #[error("error reading module data: {source}")]
    #[diagnostic(code(gobuild::modules::decode))]
    Decode {
        #[source]
        source: DecodeError,
    },

    /// The listing decoded cleanly but no record was the main module
    #[error("couldn't find main module")]
    #[diagnostic(
        code(gobuild::modules::main_not_found),
        help("Run from inside a module, or check the project layout with `go list -m`")
    )]
    MainNotFound,
}

/// Errors produced while decoding a stream of JSON records
#[derive(Error, Debug, Diagnostic)]
pub enum DecodeError {
    #[error("malformed record starting at byte {offset}: {source}")]
    #[diagnostic(code(gobuild::decode::syntax))]
    Syntax {
        offset: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("stream ended inside a record ({pending} bytes pending)")]
    #[diagnostic(code(gobuild::decode::truncated))]
    Truncated { pending: usize },

    #[error("failed to read record stream: {0}")]
    #[diagnostic(code(gobuild::decode::io))]
    Io(#[from] std::io::Error),
}

/// Errors returned when qualifying a local import
#[derive(Error, Debug, Diagnostic)]
pub enum QualifyError {
    /// The loader matched zero or several packages
    #[error("found {found} local packages, expected 1")]
    #[diagnostic(code(gobuild::qualify::ambiguous))]
    Ambiguous { found: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Loader(#[from] ToolchainError),

    #[error("failed to decode package list: {0}")]
    #[diagnostic(code(gobuild::qualify::decode))]
    Decode(#[from] DecodeError),
}

/// Errors returned when importing a package
///
/// The toolchain's own message is kept verbatim in every variant.
#[derive(Error, Debug, Diagnostic)]
pub enum ImportError {
    #[error("{message}")]
    #[diagnostic(code(gobuild::import::not_found))]
    NotFound { path: String, message: String },

    #[error("{message}")]
    #[diagnostic(code(gobuild::import::multiple_packages))]
    MultiplePackages { dir: PathBuf, message: String },

    /// Build constraints exclude every file, or the directory holds no Go files
    #[error("{message}")]
    #[diagnostic(code(gobuild::import::no_go_files))]
    NoGoFiles { dir: PathBuf, message: String },

    #[error("{message}")]
    #[diagnostic(code(gobuild::import::import_comment))]
    ImportComment { dir: PathBuf, message: String },

    #[error("{message}")]
    #[diagnostic(code(gobuild::import::other))]
    Other { path: String, message: String },

    /// The toolchain answered with something other than one package record
    #[error("expected one package for {path}, toolchain returned {found}")]
    #[diagnostic(code(gobuild::import::unexpected_output))]
    UnexpectedOutput { path: String, found: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("failed to decode package metadata: {0}")]
    #[diagnostic(code(gobuild::import::decode))]
    Decode(#[from] DecodeError),
}

/// Errors from [`crate::resolve_reference`]
#[derive(Error, Debug, Diagnostic)]
pub enum ReferenceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Qualify(#[from] QualifyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Import(#[from] ImportError),
}
