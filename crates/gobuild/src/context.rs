//! Build contexts
//!
//! A `GoBuildContext` is created once per source directory. Construction
//! copies the shared default settings, binds the copy to the directory, and
//! reconciles its GOROOT against `go env GOROOT`. After that the context is
//! read-only, so one instance can serve concurrent calls.

use async_trait::async_trait;
use gobuild_config::ToolchainConfig;
use path_clean::PathClean;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{BuildError, ImportError, ModuleError, QualifyError};
use crate::modules::{self, ModuleGraph};
use crate::package::{self, ImportMode, Package};
use crate::probe::{mismatch_notice, probe_root};
use crate::qualify;
use crate::settings::BuildSettings;
use crate::toolchain::{GoCommand, Toolchain};

/// Resolution capabilities the rest of a build depends on
///
/// `GoBuildContext` is the toolchain-backed provider. Anything else that
/// implements the trait can stand in for it.
#[async_trait]
pub trait BuildContext: Send + Sync + fmt::Debug {
    /// Resolve `path`, as seen from `src_dir`, to full package metadata.
    async fn import_package(&self, path: &str, src_dir: &Path) -> Result<Package, ImportError>;

    /// Module graph of the project, `Ok(None)` when it is not module-based.
    async fn module_info(&self) -> Result<Option<ModuleGraph>, ModuleError>;

    /// Canonical import path of a local reference such as `./cmd/app`.
    async fn qualify_local_import(&self, import_path: &str) -> Result<String, QualifyError>;
}

/// Outcome of checking the default GOROOT against the installed toolchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootReconciliation {
    /// The probe agreed with the default
    Unchanged,
    /// The probed root replaced the default
    Overridden { previous: PathBuf },
    /// The probe could not run; the default was kept
    ProbeFailed,
    /// The probe printed nothing; the default was kept
    ProbeEmpty,
}

/// Build context backed by the `go` toolchain
#[derive(Debug, Clone)]
pub struct GoBuildContext {
    // Owned copy, never a reference to the shared defaults. Parallel builds
    // for different directories would otherwise race on it.
    settings: BuildSettings,
    toolchain: Arc<dyn Toolchain>,
    reconciliation: RootReconciliation,
    timeout: Duration,
}

impl GoBuildContext {
    /// Create a context for `dir` using `go` from `PATH`.
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self, BuildError> {
        Self::builder(dir).build().await
    }

    /// Create a context for `dir` using a loaded configuration.
    pub async fn from_config(dir: impl AsRef<Path>, config: &ToolchainConfig) -> Result<Self, BuildError> {
        config.validate()?;
        Self::builder(dir)
            .toolchain(Arc::new(GoCommand::from_config(config)))
            .build_tags(config.build_tags.iter().cloned())
            .timeout(config.timeout())
            .build()
            .await
    }

    pub fn builder(dir: impl AsRef<Path>) -> GoBuildContextBuilder {
        GoBuildContextBuilder::new(dir)
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Reconciled toolchain root
    pub fn goroot(&self) -> &Path {
        &self.settings.goroot
    }

    /// Working directory every invocation runs in
    pub fn dir(&self) -> &Path {
        &self.settings.dir
    }

    pub fn reconciliation(&self) -> &RootReconciliation {
        &self.reconciliation
    }

    /// Import with an explicit mode.
    pub async fn import_package_with_mode(
        &self,
        path: &str,
        src_dir: &Path,
        mode: ImportMode,
    ) -> Result<Package, ImportError> {
        package::import_package(self.toolchain.as_ref(), &self.settings, path, src_dir, mode).await
    }
}

#[async_trait]
impl BuildContext for GoBuildContext {
    async fn import_package(&self, path: &str, src_dir: &Path) -> Result<Package, ImportError> {
        self.import_package_with_mode(path, src_dir, ImportMode::IMPORT_COMMENT)
            .await
    }

    async fn module_info(&self) -> Result<Option<ModuleGraph>, ModuleError> {
        let listing = modules::list_modules(self.toolchain.as_ref(), &self.settings.dir);
        match tokio::time::timeout(self.timeout, listing).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    dir = %self.settings.dir.display(),
                    timeout = ?self.timeout,
                    "module listing timed out"
                );
                Ok(None)
            }
        }
    }

    async fn qualify_local_import(&self, import_path: &str) -> Result<String, QualifyError> {
        qualify::qualify_local_import(self.toolchain.as_ref(), &self.settings.dir, import_path).await
    }
}

/// Builder for [`GoBuildContext`]
#[derive(Debug)]
pub struct GoBuildContextBuilder {
    dir: PathBuf,
    toolchain: Option<Arc<dyn Toolchain>>,
    defaults: Option<BuildSettings>,
    build_tags: Vec<String>,
    timeout: Duration,
}

impl GoBuildContextBuilder {
    fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            toolchain: None,
            defaults: None,
            build_tags: Vec::new(),
            timeout: ToolchainConfig::default().timeout(),
        }
    }

    /// Toolchain used for every invocation. Defaults to [`GoCommand::new`].
    pub fn toolchain(mut self, toolchain: Arc<dyn Toolchain>) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    /// Template settings. Defaults to [`BuildSettings::default_settings`].
    pub fn defaults(mut self, defaults: BuildSettings) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn build_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.build_tags.extend(tags);
        self
    }

    /// Deadline for the streamed module listing
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn build(self) -> Result<GoBuildContext, BuildError> {
        let dir = absolute_dir(&self.dir)?;

        let mut settings = match self.defaults {
            Some(defaults) => defaults.bound_to(dir),
            None => BuildSettings::default_settings().bound_to(dir),
        };
        settings.build_tags.extend(self.build_tags);

        let toolchain = self
            .toolchain
            .unwrap_or_else(|| Arc::new(GoCommand::new()));

        let reconciliation = reconcile_root(&mut settings, toolchain.as_ref()).await;

        Ok(GoBuildContext {
            settings,
            toolchain,
            reconciliation,
            timeout: self.timeout,
        })
    }
}

/// Create a boxed [`BuildContext`] for `dir` using `go` from `PATH`.
pub async fn new_build_context(dir: impl AsRef<Path>) -> Result<Arc<dyn BuildContext>, BuildError> {
    Ok(Arc::new(GoBuildContext::new(dir).await?))
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, BuildError> {
    let resolved = if dir.as_os_str().is_empty() {
        std::env::current_dir()
    } else {
        std::path::absolute(dir)
    };
    resolved
        .map(|path| path.clean())
        .map_err(|source| BuildError::WorkingDir {
            dir: dir.to_path_buf(),
            source,
        })
}

/// Replace the settings' GOROOT with the toolchain's when they disagree.
async fn reconcile_root(settings: &mut BuildSettings, toolchain: &dyn Toolchain) -> RootReconciliation {
    let probed = match probe_root(toolchain, &settings.dir).await {
        Ok(root) => root,
        Err(err) => {
            warn!(error = %err, "unexpected error running \"go env GOROOT\"");
            return RootReconciliation::ProbeFailed;
        }
    };

    if probed.is_empty() {
        warn!("unexpected: $(go env GOROOT) is empty");
        return RootReconciliation::ProbeEmpty;
    }

    if settings.goroot.as_path() == Path::new(&probed) {
        debug!(goroot = %probed, "GOROOT matches installed toolchain");
        return RootReconciliation::Unchanged;
    }

    warn!(
        default = %settings.goroot.display(),
        probed = %probed,
        "{}",
        mismatch_notice(&settings.goroot, &probed)
    );
    let previous = std::mem::replace(&mut settings.goroot, PathBuf::from(probed));
    RootReconciliation::Overridden { previous }
}
