//! Module graph resolution
//!
//! The graph comes from `go list -mod=readonly -json -m all`, decoded one
//! record at a time. A failed invocation means "no module information" and
//! yields `Ok(None)`; only malformed output or a listing without a main
//! module are errors.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use tracing::debug;

use crate::decode::RecordDecoder;
use crate::error::ModuleError;
use crate::toolchain::{Invocation, Toolchain};

/// One module as reported by the toolchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleRecord {
    /// Module path
    pub path: String,
    /// Directory holding the module's files, absent for modules that were never fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Whether this is a main module
    #[serde(default)]
    pub main: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Only required indirectly by the main module
    #[serde(default)]
    pub indirect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_version: Option<String>,
    /// `replace` directive applied to this module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<Box<ModuleReplacement>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleReplacement {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl ModuleRecord {
    /// Directory the module's files are read from, following a replacement.
    pub fn effective_dir(&self) -> Option<&Path> {
        self.replace
            .as_ref()
            .and_then(|r| r.dir.as_deref())
            .or(self.dir.as_deref())
    }
}

/// Main module plus every listed module, keyed by path
///
/// `deps` holds every decoded record, the main module included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGraph {
    main: ModuleRecord,
    deps: FxHashMap<String, ModuleRecord>,
}

impl ModuleGraph {
    /// Build a graph from a record stream.
    ///
    /// Records with a repeated path replace the earlier one. When several
    /// records are main, the last one wins.
    pub async fn decode<R>(decoder: &mut RecordDecoder<R, ModuleRecord>) -> Result<Self, ModuleError>
    where
        R: AsyncRead + Unpin,
    {
        let mut deps = FxHashMap::default();
        let mut main: Option<ModuleRecord> = None;

        while let Some(record) = decoder
            .next_record()
            .await
            .map_err(|source| ModuleError::Decode { source })?
        {
            if record.main {
                if let Some(previous) = &main {
                    debug!(previous = %previous.path, current = %record.path, "multiple main modules listed");
                }
                main = Some(record.clone());
            }
            deps.insert(record.path.clone(), record);
        }

        let main = main.ok_or(ModuleError::MainNotFound)?;
        Ok(Self { main, deps })
    }

    pub fn main(&self) -> &ModuleRecord {
        &self.main
    }

    /// Every listed module, the main module included
    pub fn deps(&self) -> &FxHashMap<String, ModuleRecord> {
        &self.deps
    }

    pub fn get(&self, path: &str) -> Option<&ModuleRecord> {
        self.deps.get(path)
    }

    /// Listed modules other than the main module
    pub fn dependencies(&self) -> impl Iterator<Item = &ModuleRecord> {
        let main = self.main.path.as_str();
        self.deps.values().filter(move |m| m.path != main)
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    pub fn into_parts(self) -> (ModuleRecord, FxHashMap<String, ModuleRecord>) {
        (self.main, self.deps)
    }
}

/// Run the module listing in `dir` and assemble the graph.
pub async fn list_modules(
    toolchain: &dyn Toolchain,
    dir: &Path,
) -> Result<Option<ModuleGraph>, ModuleError> {
    let invocation = Invocation::list_modules(dir);

    let mut stream = match toolchain.spawn(&invocation).await {
        Ok(stream) => stream,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "module listing unavailable");
            return Ok(None);
        }
    };

    let decoded = {
        let mut decoder = RecordDecoder::new(&mut stream.stdout);
        let decoded = ModuleGraph::decode(&mut decoder).await;
        if decoded.is_err() {
            // Keep the pipe moving so the process can exit and report its status.
            let _ = tokio::io::copy(decoder.into_inner(), &mut tokio::io::sink()).await;
        }
        decoded
    };

    if let Err(err) = stream.finish().await {
        debug!(dir = %dir.display(), error = %err, "module listing failed");
        return Ok(None);
    }

    decoded.map(Some)
}
