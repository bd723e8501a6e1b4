//! Toolchain invocation settings.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default upper bound for a single toolchain invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default cap on captured stdout (256 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 256 * 1024 * 1024;

/// Accepted `log_level` values, compared case-insensitively.
pub const LOG_LEVELS: &[&str] = &["silent", "off", "error", "warn", "warning", "info", "debug"];

/// How the external `go` toolchain is located and invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Binary used for every invocation. Resolved through `PATH` when relative.
    pub go: PathBuf,

    /// Deadline applied to each invocation, in seconds.
    pub timeout_secs: u64,

    /// Maximum stdout captured from a non-streamed invocation.
    pub max_output_bytes: usize,

    /// Extra environment passed to every invocation.
    pub env: BTreeMap<String, String>,

    /// Build tags forwarded to package imports.
    pub build_tags: Vec<String>,

    /// One of [`LOG_LEVELS`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            go: PathBuf::from("go"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            env: BTreeMap::new(),
            build_tags: Vec::new(),
            log_level: None,
        }
    }
}

impl ToolchainConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject values that would make every invocation fail.
    pub fn validate(&self) -> Result<()> {
        if self.go.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value("go", "binary path is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.max_output_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "max_output_bytes",
                "must be greater than zero",
            ));
        }
        if let Some(tag) = self.build_tags.iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "build_tags",
                format!("empty build tag {tag:?}"),
            ));
        }
        if let Some(level) = self
            .log_level
            .as_ref()
            .filter(|level| !LOG_LEVELS.contains(&level.to_lowercase().as_str()))
        {
            return Err(ConfigError::invalid_value(
                "log_level",
                format!("unknown level {level:?}, expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }
        Ok(())
    }
}
