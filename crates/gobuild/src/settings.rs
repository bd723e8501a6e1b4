//! Build settings snapshot
//!
//! `BuildSettings::default_settings()` is the process-wide template, computed
//! once from the environment the binary runs in. It is never mutated: every
//! build context clones it and binds the clone to its own working directory,
//! so parallel resolutions never observe each other's state.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// GOROOT the binary was built against, if `GOROOT` was set at compile time.
const COMPILED_GOROOT: Option<&str> = option_env!("GOROOT");

/// Last-resort GOROOT when neither the environment nor the build provide one.
const FALLBACK_GOROOT: &str = "/usr/local/go";

static DEFAULT_SETTINGS: Lazy<BuildSettings> = Lazy::new(BuildSettings::from_process_env);

/// Settings that drive package resolution for one build context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Toolchain installation root
    pub goroot: PathBuf,
    /// GOPATH workspace root
    pub gopath: PathBuf,
    /// Target operating system
    pub goos: String,
    /// Target architecture
    pub goarch: String,
    /// Whether cgo is enabled
    pub cgo_enabled: bool,
    /// Compiler name (`gc` or `gccgo`)
    pub compiler: String,
    /// Extra build tags
    pub build_tags: Vec<String>,
    /// Working directory the toolchain runs in. Empty in the shared template.
    pub dir: PathBuf,
}

impl BuildSettings {
    /// The shared, immutable template every context copies
    pub fn default_settings() -> &'static BuildSettings {
        &DEFAULT_SETTINGS
    }

    /// Compute settings from process environment variables
    pub fn from_process_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Compute settings from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let goroot = lookup("GOROOT")
            .or_else(|| COMPILED_GOROOT.map(str::to_string))
            .unwrap_or_else(|| FALLBACK_GOROOT.to_string());

        let gopath = lookup("GOPATH")
            .map(PathBuf::from)
            .or_else(|| lookup("HOME").map(|home| Path::new(&home).join("go")))
            .unwrap_or_default();

        let host_os = host_goos();
        let host_arch = host_goarch();
        let goos = lookup("GOOS").unwrap_or_else(|| host_os.to_string());
        let goarch = lookup("GOARCH").unwrap_or_else(|| host_arch.to_string());

        // cgo is on by default only for native builds.
        let cgo_enabled = match lookup("CGO_ENABLED").as_deref() {
            Some("1") => true,
            Some(_) => false,
            None => goos == host_os && goarch == host_arch,
        };

        let compiler = lookup("GOCOMPILER").unwrap_or_else(|| "gc".to_string());

        Self {
            goroot: PathBuf::from(goroot),
            gopath,
            goos,
            goarch,
            cgo_enabled,
            compiler,
            build_tags: Vec::new(),
            dir: PathBuf::new(),
        }
    }

    /// Copy these settings bound to a working directory
    pub fn bound_to(&self, dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..self.clone()
        }
    }

    /// Environment overrides that make the toolchain honor these settings
    pub fn toolchain_env(&self) -> Vec<(String, String)> {
        vec![
            ("GOROOT".to_string(), self.goroot.to_string_lossy().into_owned()),
            ("GOOS".to_string(), self.goos.clone()),
            ("GOARCH".to_string(), self.goarch.clone()),
            (
                "CGO_ENABLED".to_string(),
                if self.cgo_enabled { "1" } else { "0" }.to_string(),
            ),
        ]
    }
}

fn host_goos() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_goarch() -> &'static str {
    goarch_for(std::env::consts::ARCH, cfg!(target_endian = "little"))
}

/// Go's name for a Rust target architecture. Rust names big- and
/// little-endian variants alike; Go does not.
fn goarch_for(arch: &'static str, little_endian: bool) -> &'static str {
    match (arch, little_endian) {
        ("x86_64", _) => "amd64",
        ("x86", _) => "386",
        ("aarch64", _) => "arm64",
        ("powerpc64", true) => "ppc64le",
        ("powerpc64", false) => "ppc64",
        ("mips64", true) => "mips64le",
        ("mips", true) => "mipsle",
        ("loongarch64", _) => "loong64",
        ("wasm32", _) => "wasm",
        (other, _) => other,
    }
}
