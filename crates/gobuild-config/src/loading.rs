use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use tracing::debug;

use crate::config::ToolchainConfig;
use crate::error::{ConfigError, Result};

/// Project-level config file, looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "gobuild.toml";

/// Prefix for environment overrides (`GOBUILD_GO`, `GOBUILD_TIMEOUT_SECS`, ...).
pub const ENV_PREFIX: &str = "GOBUILD_";

impl ToolchainConfig {
    /// Load configuration for a project directory.
    /// Priority: environment variables > gobuild.toml > defaults
    pub fn load(project_dir: impl AsRef<Path>) -> Result<Self> {
        let config: Self = Self::figment(project_dir.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file. Environment variables still win.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The provider stack used by [`ToolchainConfig::load`].
    pub fn figment(project_dir: &Path) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let file = project_dir.join(CONFIG_FILE_NAME);
        if file.is_file() {
            debug!(path = %file.display(), "loading toolchain config file");
            figment = figment.merge(Toml::file(file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }
}
