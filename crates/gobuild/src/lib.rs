#![cfg_attr(docsrs, feature(doc_cfg))]

//! # gobuild
//!
//! Build-environment resolution for tools that drive the Go toolchain.
//!
//! Given a source directory, a [`GoBuildContext`]:
//!
//! - reconciles the compiled-in GOROOT with `go env GOROOT`, warning and
//!   switching to the installed toolchain when they disagree;
//! - lists the module graph (`go list -m all`), streamed one record at a time;
//! - qualifies local references like `./cmd/app` to canonical import paths;
//! - imports packages with their files, imports and directory.
//!
//! Everything the crate knows about Go comes from the toolchain itself. It
//! interprets `go` output but never reimplements its resolution rules.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gobuild::{BuildContext, GoBuildContext};
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = GoBuildContext::new("./my-service").await?;
//! println!("GOROOT: {}", ctx.goroot().display());
//!
//! if let Some(modules) = ctx.module_info().await? {
//!     println!("main module: {}", modules.main().path);
//! }
//!
//! let path = ctx.qualify_local_import("./cmd/server").await?;
//! let pkg = ctx.import_package(&path, ctx.dir()).await?;
//! println!("{} has {} files", pkg.import_path, pkg.go_files.len());
//! # Ok(()) }
//! ```
//!
//! ## Concurrency
//!
//! Each context owns a private copy of [`BuildSettings`], so contexts for
//! different directories can be created and used in parallel. A context is
//! read-only after construction and can be shared behind an `Arc`.
//!
//! Every invocation is bounded by a deadline, and dropping a pending future
//! kills the child process.

pub mod context;
pub mod decode;
pub mod error;
pub mod modules;
pub mod package;
pub mod probe;
pub mod qualify;
pub mod reference;
pub mod settings;
pub mod toolchain;

#[cfg(feature = "logging")]
pub mod logging;

pub use context::{
    BuildContext, GoBuildContext, GoBuildContextBuilder, RootReconciliation, new_build_context,
};
pub use decode::{DecoderState, RecordDecoder};
pub use error::{
    BuildError, DecodeError, ImportError, ModuleError, QualifyError, ReferenceError,
    ToolchainError, ToolchainResult,
};
pub use modules::{ModuleGraph, ModuleRecord, ModuleReplacement};
pub use package::{ImportMode, Package};
pub use probe::probe_root;
pub use qualify::PackageDescriptor;
pub use reference::{is_local_import, resolve_reference};
pub use settings::BuildSettings;
pub use toolchain::{GoCommand, Invocation, Toolchain, ToolchainStream};

pub use gobuild_config::ToolchainConfig;
