//! Layered configuration for the gobuild resolution layer.
//!
//! Settings are merged from serialized defaults, an optional `gobuild.toml`
//! in the project directory, and `GOBUILD_`-prefixed environment variables,
//! in that order of increasing priority.

pub mod config;
pub mod error;
pub mod loading;

pub use config::*;
pub use error::*;
pub use loading::{CONFIG_FILE_NAME, ENV_PREFIX};
