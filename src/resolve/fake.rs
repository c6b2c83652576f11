use super::{InstalledTree, ResolvedPackage, Resolver, VariantSelection};
use crate::error::ResolutionError;
use crate::manifest::{self, DependencyManifest, LockFile};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Programmable resolver for exercising pipeline properties (cache-hit
/// behavior, failure propagation) without invoking a package manager.
pub struct FakeResolver {
    install_prefix: PathBuf,
    conflict: Option<String>,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new(install_prefix: impl Into<PathBuf>) -> Self {
        Self {
            install_prefix: install_prefix.into(),
            conflict: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every subsequent resolve fails with the given conflict message.
    pub fn failing_with(install_prefix: impl Into<PathBuf>, conflict: impl Into<String>) -> Self {
        Self {
            install_prefix: install_prefix.into(),
            conflict: Some(conflict.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Resolver for FakeResolver {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn resolve(
        &self,
        manifest: &DependencyManifest,
        lock: Option<&LockFile>,
        selection: &VariantSelection,
    ) -> Result<InstalledTree, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.conflict {
            return Err(ResolutionError::Conflict(message.clone()));
        }

        manifest::check_agreement(manifest, lock)?;

        let packages = manifest
            .requirements
            .iter()
            .map(|req| ResolvedPackage {
                name: req.name.clone(),
                version: req.version.clone(),
            })
            .collect();

        Ok(InstalledTree {
            prefix: self.install_prefix.clone(),
            packages,
            install_commands: vec!["fake-install".to_string()],
            cache_paths: vec!["/root/.cache/fake".to_string()],
            cache_key: manifest::install_cache_key(manifest, lock, &selection.mechanism),
        })
    }
}
