//! Import reference helpers

use std::path::Path;

use crate::context::BuildContext;
use crate::error::ReferenceError;
use crate::package::Package;

/// Whether `reference` is relative to a directory rather than an import path
pub fn is_local_import(reference: &str) -> bool {
    reference == "."
        || reference == ".."
        || reference.starts_with("./")
        || reference.starts_with("../")
}

/// Import `reference`, qualifying it first when it is local.
pub async fn resolve_reference(
    context: &dyn BuildContext,
    reference: &str,
    src_dir: &Path,
) -> Result<Package, ReferenceError> {
    let import_path = if is_local_import(reference) {
        context.qualify_local_import(reference).await?
    } else {
        reference.to_string()
    };

    Ok(context.import_package(&import_path, src_dir).await?)
}
