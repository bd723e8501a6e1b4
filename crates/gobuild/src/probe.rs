//! GOROOT probing
//!
//! The compiled-in default GOROOT describes the toolchain this binary was
//! built against, which goes stale when a package manager upgrades Go or a
//! prebuilt binary runs on another machine. `probe_root` asks the installed
//! toolchain instead.

use std::path::Path;

use crate::error::ToolchainResult;
use crate::toolchain::{Invocation, Toolchain};

/// Query `go env GOROOT` in `dir`, trimmed of surrounding whitespace.
///
/// An empty string is returned as-is; deciding what it means is up to the caller.
pub async fn probe_root(toolchain: &dyn Toolchain, dir: &Path) -> ToolchainResult<String> {
    let stdout = toolchain.run(&Invocation::env_goroot(dir)).await?;
    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
}

/// Notice printed when the default and probed GOROOT disagree
pub(crate) fn mismatch_notice(default_root: &Path, probed_root: &str) -> String {
    format!(
        r#"NOTICE!
-----------------------------------------------------------------
gobuild and go have mismatched GOROOT:
    default GOROOT = {default:?}
    $(go env GOROOT) = {probed:?}

Inferring GOROOT={probed:?}

Run this to remove this warning:
    export GOROOT=$(go env GOROOT)
-----------------------------------------------------------------"#,
        default = default_root.display().to_string(),
        probed = probed_root,
    )
}
