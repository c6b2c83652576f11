//! End-to-end properties of the build pipeline: cache-key stability,
//! install-layer determinism, and the runtime-stage hygiene guarantees.

use layercake::config::PipelineConfig;
use layercake::fs::RealFileSystem;
use layercake::pipeline::{BuildContext, PipelineOrchestrator};
use layercake::resolve::{CachingResolver, FakeResolver, Resolver, UvResolver, VariantSelection};
use layercake::{DependencyManifest, ImageSpec, LockFile};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const MANIFEST: &str = "\
fastapi==0.111.0
uvicorn==0.30.1
torch==2.3.1
sentence-transformers==3.0.1
";

const LOCK: &str = "\
anyio==4.4.0
fastapi==0.111.0
filelock==3.15.4
sentence-transformers==3.0.1
torch==2.3.1
uvicorn==0.30.1
";

fn write_service(dir: &Path, app_body: &str) {
    fs::write(dir.join("requirements.txt"), MANIFEST).unwrap();
    fs::write(dir.join("requirements.lock"), LOCK).unwrap();
    fs::create_dir_all(dir.join("app")).unwrap();
    fs::write(dir.join("app/main.py"), app_body).unwrap();
}

async fn plan(dir: &Path) -> ImageSpec {
    let config = PipelineConfig::default();
    let prefix = config.install_prefix.clone();
    let mut context = BuildContext::new(
        dir,
        config,
        Arc::new(RealFileSystem::new()),
        Arc::new(UvResolver::new(prefix)),
    );
    PipelineOrchestrator::new()
        .execute(&mut context)
        .await
        .unwrap()
}

#[tokio::test]
async fn app_source_changes_do_not_touch_the_install_layer() {
    let temp = TempDir::new().unwrap();
    write_service(temp.path(), "app = 'v1'\n");
    let first = plan(temp.path()).await;

    // Rewrite the application, leave the dependency declaration alone.
    write_service(temp.path(), "app = 'v2: a substantial rewrite'\n");
    let second = plan(temp.path()).await;

    assert_eq!(
        first.metadata.install_cache_key,
        second.metadata.install_cache_key
    );
    assert_eq!(first.builder.commands, second.builder.commands);
    assert_eq!(first.builder.context, second.builder.context);
}

#[tokio::test]
async fn manifest_change_busts_the_install_layer() {
    let temp = TempDir::new().unwrap();
    write_service(temp.path(), "app = 'v1'\n");
    let first = plan(temp.path()).await;

    fs::write(
        temp.path().join("requirements.txt"),
        format!("{}httpx==0.27.0\n", MANIFEST),
    )
    .unwrap();
    fs::write(
        temp.path().join("requirements.lock"),
        format!("{}httpx==0.27.0\n", LOCK),
    )
    .unwrap();
    let second = plan(temp.path()).await;

    assert_ne!(
        first.metadata.install_cache_key,
        second.metadata.install_cache_key
    );
}

#[tokio::test]
async fn resolved_pin_set_is_deterministic() {
    let manifest = DependencyManifest::parse(MANIFEST).unwrap();
    let lock = LockFile::parse(LOCK).unwrap();
    let selection = VariantSelection {
        ml_package: "torch".to_string(),
        mechanism: PipelineConfig::default().variant_mechanism().unwrap(),
    };

    let resolver = UvResolver::new("/opt/venv");
    let first = resolver
        .resolve(&manifest, Some(&lock), &selection)
        .unwrap();
    let second = resolver
        .resolve(&manifest, Some(&lock), &selection)
        .unwrap();

    assert_eq!(first.packages, second.packages);
    assert_eq!(first.cache_key, second.cache_key);
}

#[tokio::test]
async fn unchanged_manifest_resolves_once_across_rebuilds() {
    let temp = TempDir::new().unwrap();
    write_service(temp.path(), "app = 'v1'\n");

    let resolver = Arc::new(CachingResolver::new(FakeResolver::new("/opt/venv")));
    let mut seen_keys = std::collections::HashSet::new();

    for body in ["app = 'v1'\n", "app = 'v2'\n", "app = 'v3'\n"] {
        write_service(temp.path(), body);
        let config = PipelineConfig::default();
        let mut context = BuildContext::new(
            temp.path(),
            config,
            Arc::new(RealFileSystem::new()),
            resolver.clone(),
        );
        let image = PipelineOrchestrator::new()
            .execute(&mut context)
            .await
            .unwrap();
        seen_keys.insert(image.metadata.install_cache_key);
    }

    // Three builds over an unchanged manifest/lock pair: one cache key and
    // one underlying resolution, the rest replayed from the cache.
    assert_eq!(seen_keys.len(), 1);
    assert_eq!(resolver.inner().call_count(), 1);
}

#[tokio::test]
async fn runtime_stage_is_free_of_toolchain_and_caches() {
    let temp = TempDir::new().unwrap();
    write_service(temp.path(), "app = 'v1'\n");
    let image = plan(temp.path()).await;

    for package in &image.runtime.packages {
        assert_ne!(package, "build-essential");
        assert_ne!(package, "gcc");
        assert_ne!(package, "pip");
        assert_ne!(package, "uv");
    }
    for copy in &image.runtime.copy {
        assert!(!copy.from.contains(".cache"));
    }
    // The builder's purge list covers every installer cache.
    assert!(image
        .builder
        .cache_purge
        .iter()
        .any(|p| p.contains(".cache")));
}

#[tokio::test]
async fn image_exposes_exactly_port_8000() {
    let temp = TempDir::new().unwrap();
    write_service(temp.path(), "app = 'v1'\n");
    let image = plan(temp.path()).await;

    assert_eq!(image.runtime.ports, vec![8000]);
    let health = image.runtime.health.expect("healthcheck must be declared");
    assert_eq!(
        (health.interval_secs, health.timeout_secs, health.retries),
        (30, 3, 3)
    );
}

#[tokio::test]
async fn ambiguous_variant_mechanism_produces_no_plan() {
    let temp = TempDir::new().unwrap();
    write_service(temp.path(), "app = 'v1'\n");

    let config = PipelineConfig::default()
        .with_cpu_index_url("https://example.invalid/whl/cpu")
        .with_cpu_extra("cpu");
    let prefix = config.install_prefix.clone();
    let mut context = BuildContext::new(
        temp.path(),
        config,
        Arc::new(RealFileSystem::new()),
        Arc::new(UvResolver::new(prefix)),
    );

    let err = PipelineOrchestrator::new()
        .execute(&mut context)
        .await
        .unwrap_err();
    assert!(err
        .chain()
        .any(|c| c.to_string().contains("exactly one CPU variant mechanism")));
    assert!(context.image.is_none());
}

#[tokio::test]
async fn missing_lock_is_tolerated_but_keyed_differently() {
    let temp = TempDir::new().unwrap();
    write_service(temp.path(), "app = 'v1'\n");
    let locked = plan(temp.path()).await;

    fs::remove_file(temp.path().join("requirements.lock")).unwrap();
    let floating = plan(temp.path()).await;

    assert_ne!(
        locked.metadata.install_cache_key,
        floating.metadata.install_cache_key
    );
    assert!(floating.builder.commands[1].ends_with("-r requirements.txt"));
}
