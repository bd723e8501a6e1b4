//! Local import qualification
//!
//! A reference such as `./cmd/server` only means something relative to a
//! directory. The toolchain turns it into the canonical import path
//! (`example.com/app/cmd/server`) with a name-only package lookup.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::decode::RecordDecoder;
use crate::error::QualifyError;
use crate::toolchain::{Invocation, Toolchain};

/// The subset of a listed package needed to name it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageDescriptor {
    pub import_path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Resolve `reference` from `dir` to exactly one canonical import path.
pub async fn qualify_local_import(
    toolchain: &dyn Toolchain,
    dir: &Path,
    reference: &str,
) -> Result<String, QualifyError> {
    let stdout = toolchain
        .run(&Invocation::find_packages(dir, reference))
        .await?;

    let packages: Vec<PackageDescriptor> =
        RecordDecoder::new(stdout.as_slice()).collect_all().await?;

    let [package] = <[PackageDescriptor; 1]>::try_from(packages)
        .map_err(|packages| QualifyError::Ambiguous {
            found: packages.len(),
        })?;

    Ok(package.import_path)
}
