//! Narrow interface over the external package manager.
//!
//! The resolution algorithm itself is opaque; the pipeline only needs
//! `resolve(manifest, lock, selection) -> InstalledTree | ResolutionError`,
//! which lets the caching and variant-determinism properties be tested
//! against a fake without installing anything.

mod cache;
mod fake;
mod uv;

pub use cache::CachingResolver;
pub use fake::FakeResolver;
pub use uv::UvResolver;

use crate::error::ResolutionError;
use crate::manifest::{DependencyManifest, LockFile};
use std::path::PathBuf;

/// How the CPU-only build of the ML runtime is selected. Exactly one
/// mechanism is active per build; holding both is rejected at configuration
/// time (see `PipelineConfig::variant_mechanism`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantMechanism {
    /// Resolve the ML runtime from a dedicated CPU wheel index.
    CpuIndex { url: String },
    /// Ask the installer for the CPU dependency group of the project.
    CpuExtra { group: String },
}

impl VariantMechanism {
    /// Arguments contributed to the install invocation.
    pub fn install_args(&self) -> Vec<String> {
        match self {
            VariantMechanism::CpuIndex { url } => vec![
                "--index-url".to_string(),
                url.clone(),
                "--extra-index-url".to_string(),
                "https://pypi.org/simple".to_string(),
            ],
            VariantMechanism::CpuExtra { group } => {
                vec!["--group".to_string(), group.clone()]
            }
        }
    }

    /// Stable identity fed into the install-layer cache key; switching
    /// mechanisms changes the resolved wheel set and must bust the layer.
    pub fn fingerprint(&self) -> String {
        match self {
            VariantMechanism::CpuIndex { url } => format!("cpu-index:{}", url),
            VariantMechanism::CpuExtra { group } => format!("cpu-extra:{}", group),
        }
    }
}

/// The full variant decision for one build: which package is the ML runtime
/// and how its CPU-only build is reached.
#[derive(Debug, Clone)]
pub struct VariantSelection {
    pub ml_package: String,
    pub mechanism: VariantMechanism,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: Option<String>,
}

/// The Installed Artifact Tree: everything the Builder stage hands to the
/// Runtime stage. Immutable once produced; the Runtime stage receives it
/// read-only and never re-installs.
#[derive(Debug, Clone)]
pub struct InstalledTree {
    pub prefix: PathBuf,
    pub packages: Vec<ResolvedPackage>,
    pub install_commands: Vec<String>,
    pub cache_paths: Vec<String>,
    pub cache_key: String,
}

pub trait Resolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        manifest: &DependencyManifest,
        lock: Option<&LockFile>,
        selection: &VariantSelection,
    ) -> Result<InstalledTree, ResolutionError>;
}
