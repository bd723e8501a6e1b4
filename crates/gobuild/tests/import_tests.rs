//! Local import qualification, package import and reference resolution

mod common;

use async_trait::async_trait;
use common::{DEFAULT_GOROOT, ScriptedToolchain, default_settings, project_dir};
use gobuild::{
    BuildContext, GoBuildContext, ImportError, ImportMode, ModuleError, ModuleGraph, Package,
    QualifyError, ReferenceError, ToolchainError, resolve_reference,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SERVER_DESCRIPTOR: &str = r#"{
	"Dir": "/src/app/cmd/server",
	"ImportPath": "example.com/app/cmd/server",
	"Name": "main"
}
"#;

const SERVER_PACKAGE: &str = r#"{
	"Dir": "/src/app/cmd/server",
	"ImportPath": "example.com/app/cmd/server",
	"Name": "main",
	"Root": "/src/app",
	"GoFiles": ["main.go", "routes.go"],
	"Imports": ["fmt", "net/http"],
	"Module": {"Path": "example.com/app", "Main": true, "Dir": "/src/app"}
}
"#;

async fn context_with(toolchain: Arc<ScriptedToolchain>, dir: &Path) -> GoBuildContext {
    GoBuildContext::builder(dir)
        .defaults(default_settings(DEFAULT_GOROOT))
        .toolchain(toolchain)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn qualifies_single_local_package() {
    let dir = project_dir();
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond("list -find -json -- ./cmd/server", SERVER_DESCRIPTOR)
        .into_arc();
    let ctx = context_with(toolchain.clone(), dir.path()).await;

    let path = ctx.qualify_local_import("./cmd/server").await.unwrap();
    assert_eq!(path, "example.com/app/cmd/server");

    let lookups = toolchain.calls_to("list -find -json -- ./cmd/server");
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].dir, ctx.dir());
}

#[tokio::test]
async fn qualify_rejects_no_matches() {
    let dir = project_dir();
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond("list -find -json -- ./empty/...", "")
        .into_arc();
    let ctx = context_with(toolchain, dir.path()).await;

    let err = ctx.qualify_local_import("./empty/...").await.unwrap_err();
    assert!(matches!(err, QualifyError::Ambiguous { found: 0 }));
    assert_eq!(err.to_string(), "found 0 local packages, expected 1");
}

#[tokio::test]
async fn qualify_rejects_pattern_matching_two_packages() {
    let dir = project_dir();
    let listing = r#"{"ImportPath": "example.com/app/cmd/server", "Name": "main"}
{"ImportPath": "example.com/app/cmd/worker", "Name": "main"}
"#;
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond("list -find -json -- ./cmd/...", listing)
        .into_arc();
    let ctx = context_with(toolchain, dir.path()).await;

    let err = ctx.qualify_local_import("./cmd/...").await.unwrap_err();
    assert_eq!(err.to_string(), "found 2 local packages, expected 1");
}

#[tokio::test]
async fn qualify_propagates_loader_failure() {
    let dir = project_dir();
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .fail(
            "list -find -json -- ./missing",
            "",
            1,
            "stat ./missing: directory not found",
        )
        .into_arc();
    let ctx = context_with(toolchain, dir.path()).await;

    let err = ctx.qualify_local_import("./missing").await.unwrap_err();
    assert!(matches!(
        err,
        QualifyError::Loader(ToolchainError::Exit { exit_code: 1, .. })
    ));
}

#[tokio::test]
async fn imports_package_with_reconciled_environment() {
    let dir = project_dir();
    let toolchain = ScriptedToolchain::new()
        .goroot("/opt/go1.15")
        .respond("list -e -json -- example.com/app/cmd/server", SERVER_PACKAGE)
        .into_arc();
    let ctx = context_with(toolchain.clone(), dir.path()).await;

    let src = PathBuf::from("/src/app");
    let pkg = ctx
        .import_package("example.com/app/cmd/server", &src)
        .await
        .unwrap();

    assert_eq!(pkg.import_path, "example.com/app/cmd/server");
    assert_eq!(pkg.dir, PathBuf::from("/src/app/cmd/server"));
    assert!(pkg.is_command());
    assert_eq!(pkg.go_files, vec!["main.go", "routes.go"]);
    assert_eq!(pkg.imports, vec!["fmt", "net/http"]);

    let imports = toolchain.calls_to("list -e -json -- example.com/app/cmd/server");
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].dir, src);
    assert!(
        imports[0]
            .env
            .contains(&("GOROOT".to_string(), "/opt/go1.15".to_string()))
    );
}

#[tokio::test]
async fn empty_source_dir_falls_back_to_context_dir() {
    let dir = project_dir();
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond("list -e -json -- example.com/app/cmd/server", SERVER_PACKAGE)
        .into_arc();
    let ctx = context_with(toolchain.clone(), dir.path()).await;

    ctx.import_package("example.com/app/cmd/server", Path::new(""))
        .await
        .unwrap();

    let imports = toolchain.calls_to("list -e -json -- example.com/app/cmd/server");
    assert_eq!(imports[0].dir, ctx.dir());
}

#[tokio::test]
async fn import_comment_overrides_listed_path() {
    let dir = project_dir();
    let listing = r#"{
	"Dir": "/go/src/github.com/old/name",
	"ImportPath": "github.com/old/name",
	"ImportComment": "example.com/name",
	"Name": "name",
	"GoFiles": ["name.go"]
}"#;
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond("list -e -json -- github.com/old/name", listing)
        .into_arc();
    let ctx = context_with(toolchain, dir.path()).await;

    let pkg = ctx
        .import_package("github.com/old/name", dir.path())
        .await
        .unwrap();
    assert_eq!(pkg.import_path, "example.com/name");

    let plain = ctx
        .import_package_with_mode("github.com/old/name", dir.path(), ImportMode::default())
        .await
        .unwrap();
    assert_eq!(plain.import_path, "github.com/old/name");
    assert_eq!(plain.import_comment, "example.com/name");
}

#[tokio::test]
async fn find_only_mode_and_build_tags_shape_the_invocation() {
    let dir = project_dir();
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond(
            "list -e -json -find -tags=netgo -- example.com/app/cmd/server",
            SERVER_PACKAGE,
        )
        .into_arc();
    let ctx = GoBuildContext::builder(dir.path())
        .defaults(default_settings(DEFAULT_GOROOT))
        .toolchain(toolchain)
        .build_tags(["netgo".to_string()])
        .build()
        .await
        .unwrap();

    let mode = ImportMode {
        import_comment: true,
        find_only: true,
    };
    let pkg = ctx
        .import_package_with_mode("example.com/app/cmd/server", dir.path(), mode)
        .await
        .unwrap();
    assert_eq!(pkg.name, "main");
}

#[tokio::test]
async fn missing_package_is_reported_as_not_found() {
    let dir = project_dir();
    let listing = r#"{
	"ImportPath": "example.com/missing",
	"Error": {
		"Err": "no required module provides package example.com/missing; to add it:\n\tgo get example.com/missing"
	}
}"#;
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond("list -e -json -- example.com/missing", listing)
        .into_arc();
    let ctx = context_with(toolchain, dir.path()).await;

    let err = ctx
        .import_package("example.com/missing", dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::NotFound { ref path, .. } if path == "example.com/missing"));
}

#[tokio::test]
async fn directory_without_sources_is_reported() {
    let dir = project_dir();
    let listing = r#"{
	"Dir": "/src/app/docs",
	"ImportPath": "example.com/app/docs",
	"Error": {"Err": "no Go files in /src/app/docs"}
}"#;
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond("list -e -json -- example.com/app/docs", listing)
        .into_arc();
    let ctx = context_with(toolchain, dir.path()).await;

    let err = ctx
        .import_package("example.com/app/docs", dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::NoGoFiles { ref dir, .. } if dir == Path::new("/src/app/docs")));
}

#[tokio::test]
async fn pattern_expanding_to_many_packages_is_rejected() {
    let dir = project_dir();
    let listing = r#"{"ImportPath": "example.com/app/a", "Name": "a"}
{"ImportPath": "example.com/app/b", "Name": "b"}"#;
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond("list -e -json -- example.com/app/...", listing)
        .into_arc();
    let ctx = context_with(toolchain, dir.path()).await;

    let err = ctx
        .import_package("example.com/app/...", dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::UnexpectedOutput { found: 2, .. }));
}

#[tokio::test]
async fn resolve_reference_qualifies_local_paths_first() {
    let dir = project_dir();
    let toolchain = ScriptedToolchain::new()
        .goroot(DEFAULT_GOROOT)
        .respond("list -find -json -- ./cmd/server", SERVER_DESCRIPTOR)
        .respond("list -e -json -- example.com/app/cmd/server", SERVER_PACKAGE)
        .into_arc();
    let ctx = context_with(toolchain.clone(), dir.path()).await;

    let pkg = resolve_reference(&ctx, "./cmd/server", ctx.dir())
        .await
        .unwrap();
    assert_eq!(pkg.import_path, "example.com/app/cmd/server");
    assert_eq!(toolchain.calls_to("list -find -json -- ./cmd/server").len(), 1);
}

/// Capability double standing in for the toolchain-backed context
#[derive(Debug, Default)]
struct StaticBuildContext {
    packages: Vec<Package>,
    qualified: Option<String>,
    imported: Mutex<Vec<(String, PathBuf)>>,
}

#[async_trait]
impl BuildContext for StaticBuildContext {
    async fn import_package(&self, path: &str, src_dir: &Path) -> Result<Package, ImportError> {
        self.imported
            .lock()
            .push((path.to_string(), src_dir.to_path_buf()));
        self.packages
            .iter()
            .find(|p| p.import_path == path)
            .cloned()
            .ok_or_else(|| ImportError::NotFound {
                path: path.to_string(),
                message: format!("cannot find package {path:?}"),
            })
    }

    async fn module_info(&self) -> Result<Option<ModuleGraph>, ModuleError> {
        Ok(None)
    }

    async fn qualify_local_import(&self, _import_path: &str) -> Result<String, QualifyError> {
        self.qualified
            .clone()
            .ok_or(QualifyError::Ambiguous { found: 0 })
    }
}

fn package(import_path: &str) -> Package {
    serde_json::from_value(serde_json::json!({
        "ImportPath": import_path,
        "Name": "lib",
    }))
    .unwrap()
}

#[tokio::test]
async fn resolve_reference_accepts_any_context() {
    let ctx = StaticBuildContext {
        packages: vec![package("example.com/lib"), package("example.com/app/internal")],
        qualified: Some("example.com/app/internal".to_string()),
        ..StaticBuildContext::default()
    };

    let pkg = resolve_reference(&ctx, "example.com/lib", Path::new("/src"))
        .await
        .unwrap();
    assert_eq!(pkg.import_path, "example.com/lib");

    let pkg = resolve_reference(&ctx, "./internal", Path::new("/src/app"))
        .await
        .unwrap();
    assert_eq!(pkg.import_path, "example.com/app/internal");

    let imported = ctx.imported.lock().clone();
    assert_eq!(
        imported,
        vec![
            ("example.com/lib".to_string(), PathBuf::from("/src")),
            ("example.com/app/internal".to_string(), PathBuf::from("/src/app")),
        ]
    );
}

#[tokio::test]
async fn resolve_reference_reports_qualification_failure() {
    let ctx = StaticBuildContext::default();

    let err = resolve_reference(&ctx, "../elsewhere", Path::new("/src/app"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReferenceError::Qualify(QualifyError::Ambiguous { found: 0 })));
    assert!(ctx.imported.lock().is_empty());
}
