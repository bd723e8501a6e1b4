//! Package metadata import
//!
//! Packages are loaded with `go list -e -json`, which reports load failures
//! inside the record instead of failing the whole command. Those failures are
//! mapped onto distinct [`ImportError`] variants with the toolchain's message
//! kept as-is.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::decode::RecordDecoder;
use crate::error::ImportError;
use crate::modules::ModuleRecord;
use crate::settings::BuildSettings;
use crate::toolchain::{Invocation, Toolchain};

/// How a package import is resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportMode {
    /// Honor `package foo // import "canonical/path"` comments
    pub import_comment: bool,
    /// Only locate the package directory, skipping dependency loading
    pub find_only: bool,
}

impl ImportMode {
    /// Mode used by [`crate::BuildContext::import_package`]
    pub const IMPORT_COMMENT: Self = Self {
        import_comment: true,
        find_only: false,
    };
}

/// Resolved package metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    #[serde(default)]
    pub dir: PathBuf,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub import_path: String,
    /// Path declared by an import comment, empty when there is none
    #[serde(default)]
    pub import_comment: String,
    /// GOROOT or GOPATH entry containing the package
    #[serde(default)]
    pub root: PathBuf,
    /// Package lives under GOROOT
    #[serde(default)]
    pub goroot: bool,
    #[serde(default)]
    pub standard: bool,
    #[serde(default)]
    pub go_files: Vec<String>,
    #[serde(default)]
    pub cgo_files: Vec<String>,
    #[serde(default)]
    pub test_go_files: Vec<String>,
    #[serde(default, rename = "XTestGoFiles")]
    pub xtest_go_files: Vec<String>,
    /// Files excluded by build constraints
    #[serde(default)]
    pub ignored_go_files: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub test_imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleRecord>,
    #[serde(default, skip_serializing)]
    error: Option<PackageError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PackageError {
    #[serde(default)]
    pos: String,
    #[serde(default)]
    err: String,
}

impl Package {
    /// Whether this is an executable (`package main`)
    pub fn is_command(&self) -> bool {
        self.name == "main"
    }

    /// Source files that are compiled, cgo files included
    pub fn source_files(&self) -> impl Iterator<Item = &str> {
        self.go_files
            .iter()
            .chain(self.cgo_files.iter())
            .map(String::as_str)
    }
}

/// Import `path` relative to `src_dir` with the given settings.
pub async fn import_package(
    toolchain: &dyn Toolchain,
    settings: &BuildSettings,
    path: &str,
    src_dir: &Path,
    mode: ImportMode,
) -> Result<Package, ImportError> {
    let dir = if src_dir.as_os_str().is_empty() {
        settings.dir.as_path()
    } else {
        src_dir
    };

    let invocation = Invocation::import_package(dir, path, &settings.build_tags, mode.find_only)
        .with_env(settings.toolchain_env());
    let stdout = toolchain.run(&invocation).await?;

    let packages: Vec<Package> = RecordDecoder::new(stdout.as_slice()).collect_all().await?;
    let [mut package] = <[Package; 1]>::try_from(packages).map_err(|packages| {
        ImportError::UnexpectedOutput {
            path: path.to_string(),
            found: packages.len(),
        }
    })?;

    if let Some(error) = package.error.take() {
        return Err(classify_error(path, &package.dir, error));
    }

    if mode.import_comment && !package.import_comment.is_empty() {
        if package.import_comment != package.import_path {
            debug!(
                requested = %path,
                listed = %package.import_path,
                canonical = %package.import_comment,
                "import comment overrides import path"
            );
        }
        package.import_path = package.import_comment.clone();
    }

    Ok(package)
}

fn classify_error(path: &str, dir: &Path, error: PackageError) -> ImportError {
    let message = if error.pos.is_empty() || error.err.starts_with(&error.pos) {
        error.err
    } else {
        format!("{}: {}", error.pos, error.err)
    };
    let dir = dir.to_path_buf();

    if message.contains("no Go files") || message.contains("build constraints exclude all Go files") {
        ImportError::NoGoFiles { dir, message }
    } else if message.contains("found packages") {
        ImportError::MultiplePackages { dir, message }
    } else if message.contains("expects import") || message.contains("import comment") {
        ImportError::ImportComment { dir, message }
    } else if message.contains("cannot find package")
        || message.contains("is not in std")
        || message.contains("is not in GOROOT")
        || message.contains("no required module provides package")
        || message.contains("cannot find module")
        || message.contains("not found")
    {
        ImportError::NotFound {
            path: path.to_string(),
            message,
        }
    } else {
        ImportError::Other {
            path: path.to_string(),
            message,
        }
    }
}
