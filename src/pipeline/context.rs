use crate::config::{BaseEnvironment, PipelineConfig};
use crate::fs::FileSystem;
use crate::manifest::{DependencyManifest, LockFile};
use crate::output::schema::{BuilderStageSpec, ImageSpec, RuntimeStageSpec};
use crate::resolve::{InstalledTree, Resolver, VariantSelection};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Mutable state threaded through the phases of one build invocation.
/// Each phase fills in its own slice; nothing is shared between the Builder
/// and Runtime stages after the one-way artifact copy.
pub struct BuildContext {
    pub repo_path: PathBuf,
    pub config: PipelineConfig,
    pub fs: Arc<dyn FileSystem>,
    pub resolver: Arc<dyn Resolver>,

    pub base_env: Option<BaseEnvironment>,
    pub manifest: Option<DependencyManifest>,
    pub lock: Option<LockFile>,
    pub selection: Option<VariantSelection>,
    pub cache_key: Option<String>,
    pub tree: Option<InstalledTree>,
    pub builder: Option<BuilderStageSpec>,
    pub runtime: Option<RuntimeStageSpec>,
    pub image: Option<ImageSpec>,
}

impl BuildContext {
    pub fn new(
        repo_path: &Path,
        config: PipelineConfig,
        fs: Arc<dyn FileSystem>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            repo_path: repo_path.to_path_buf(),
            config,
            fs,
            resolver,
            base_env: None,
            manifest: None,
            lock: None,
            selection: None,
            cache_key: None,
            tree: None,
            builder: None,
            runtime: None,
            image: None,
        }
    }

    pub fn project_name(&self) -> String {
        self.repo_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app")
            .to_string()
    }
}
