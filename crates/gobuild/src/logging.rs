//! Logging utilities for gobuild
//!
//! This module is only available with the `logging` feature.
//!
//! For library users: gobuild emits tracing events - install your own subscriber.
//! For application developers: use these convenience functions.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log level for gobuild output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// No logging output
    Silent,
    /// Only errors
    Error,
    /// Errors and warnings, including GOROOT mismatch notices (default)
    #[default]
    Warn,
    /// Errors, warnings, and info
    Info,
    /// Everything, including each toolchain invocation
    Debug,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter())
    }
}

/// Initialize logging with the given level; `RUST_LOG` directives still apply.
///
/// Only the first call in a process installs a subscriber.
pub fn init_logging(level: LogLevel) {
    INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(level_directive(level))
            .from_env_lossy();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false).without_time())
            .init();
    });
}

/// Initialize logging from a configured level string.
///
/// An unknown level falls back to `Warn` and is reported once the subscriber
/// is installed.
pub fn init_logging_from_config(config: &gobuild_config::ToolchainConfig) {
    match config_level(config) {
        Ok(level) => init_logging(level),
        Err(err) => {
            init_logging(LogLevel::default());
            tracing::warn!(error = %err, fallback = %LogLevel::default(), "ignoring configured log_level");
        }
    }
}

fn config_level(config: &gobuild_config::ToolchainConfig) -> Result<LogLevel, String> {
    config
        .log_level
        .as_deref()
        .map_or(Ok(LogLevel::default()), str::parse)
}

/// Initialize logging from `RUST_LOG`, falling back to `Warn`.
pub fn init_logging_from_env() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(level_directive(LogLevel::Warn)));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false).without_time())
            .init();
    });
}

fn level_directive(level: LogLevel) -> tracing_subscriber::filter::Directive {
    use tracing_subscriber::filter::LevelFilter;

    match level {
        LogLevel::Silent => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
    }
    .into()
}
