use super::{InstalledTree, ResolvedPackage, Resolver, VariantSelection};
use crate::error::ResolutionError;
use crate::manifest::{self, DependencyManifest, LockFile, LOCK_FILE, MANIFEST_FILE};
use std::path::PathBuf;
use tracing::debug;

/// The transient installer caches purged at the end of the Builder stage.
/// Only intermediate build-cache size is at stake; nothing under these paths
/// ever reaches the Runtime stage.
const INSTALLER_CACHE_PATHS: &[&str] = &["/root/.cache/pip", "/root/.cache/uv"];

/// Real resolver: plans a `uv pip install` into a fixed prefix, fully
/// non-interactive and never creating an implicit virtualenv.
pub struct UvResolver {
    install_prefix: PathBuf,
}

impl UvResolver {
    pub fn new(install_prefix: impl Into<PathBuf>) -> Self {
        Self {
            install_prefix: install_prefix.into(),
        }
    }

    fn bootstrap_command(&self) -> String {
        "python -m pip install --no-cache-dir uv".to_string()
    }

    fn install_command(&self, lock_present: bool, selection: &VariantSelection) -> String {
        let mut argv: Vec<String> = vec![
            "uv".to_string(),
            "pip".to_string(),
            "install".to_string(),
            "--system".to_string(),
            "--no-cache".to_string(),
            "--prefix".to_string(),
            self.install_prefix.display().to_string(),
        ];
        argv.extend(selection.mechanism.install_args());
        argv.push("-r".to_string());
        // The lock is the install source when present; the manifest alone is
        // the accepted-risk fallback.
        argv.push(if lock_present { LOCK_FILE } else { MANIFEST_FILE }.to_string());
        argv.join(" ")
    }
}

impl Resolver for UvResolver {
    fn name(&self) -> &'static str {
        "uv"
    }

    fn resolve(
        &self,
        manifest: &DependencyManifest,
        lock: Option<&LockFile>,
        selection: &VariantSelection,
    ) -> Result<InstalledTree, ResolutionError> {
        manifest::check_agreement(manifest, lock)?;

        if manifest.find(&selection.ml_package).is_none() {
            return Err(ResolutionError::MissingRuntimePackage {
                package: selection.ml_package.clone(),
            });
        }

        let packages: Vec<ResolvedPackage> = match lock {
            Some(lock) => lock
                .pins
                .iter()
                .map(|pin| ResolvedPackage {
                    name: pin.name.clone(),
                    version: pin.version.clone(),
                })
                .collect(),
            None => manifest
                .requirements
                .iter()
                .map(|req| ResolvedPackage {
                    name: req.name.clone(),
                    version: req.version.clone(),
                })
                .collect(),
        };

        let cache_key = manifest::install_cache_key(manifest, lock, &selection.mechanism);
        debug!(
            resolver = self.name(),
            packages = packages.len(),
            cache_key = %cache_key,
            "Resolved dependency set"
        );

        Ok(InstalledTree {
            prefix: self.install_prefix.clone(),
            packages,
            install_commands: vec![
                self.bootstrap_command(),
                self.install_command(lock.is_some(), selection),
            ],
            cache_paths: INSTALLER_CACHE_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            cache_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::VariantMechanism;

    fn selection() -> VariantSelection {
        VariantSelection {
            ml_package: "torch".to_string(),
            mechanism: VariantMechanism::CpuIndex {
                url: "https://download.pytorch.org/whl/cpu".to_string(),
            },
        }
    }

    #[test]
    fn test_resolve_with_lock() {
        let manifest = DependencyManifest::parse("torch==2.3.1\nfastapi==0.111.0\n").unwrap();
        let lock = LockFile::parse("anyio==4.4.0\nfastapi==0.111.0\ntorch==2.3.1\n").unwrap();

        let resolver = UvResolver::new("/opt/venv");
        let tree = resolver
            .resolve(&manifest, Some(&lock), &selection())
            .unwrap();

        assert_eq!(tree.prefix, PathBuf::from("/opt/venv"));
        // Lock pins win, transitives included.
        assert_eq!(tree.packages.len(), 3);
        assert_eq!(tree.install_commands.len(), 2);
        assert!(tree.install_commands[0].contains("pip install --no-cache-dir uv"));
        let cmd = &tree.install_commands[1];
        assert!(cmd.contains("--prefix /opt/venv"));
        assert!(cmd.contains("--index-url https://download.pytorch.org/whl/cpu"));
        assert!(cmd.ends_with("-r requirements.lock"));
    }

    #[test]
    fn test_resolve_without_lock_floats() {
        let manifest = DependencyManifest::parse("torch==2.3.1\n").unwrap();
        let resolver = UvResolver::new("/opt/venv");
        let tree = resolver.resolve(&manifest, None, &selection()).unwrap();
        assert!(tree.install_commands[1].ends_with("-r requirements.txt"));
    }

    #[test]
    fn test_missing_ml_package_is_fatal() {
        let manifest = DependencyManifest::parse("fastapi==0.111.0\n").unwrap();
        let resolver = UvResolver::new("/opt/venv");
        let err = resolver.resolve(&manifest, None, &selection()).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::MissingRuntimePackage { .. }
        ));
    }

    #[test]
    fn test_lock_conflict_aborts() {
        let manifest = DependencyManifest::parse("torch==2.3.1\n").unwrap();
        let lock = LockFile::parse("torch==2.4.0\n").unwrap();
        let resolver = UvResolver::new("/opt/venv");
        let err = resolver
            .resolve(&manifest, Some(&lock), &selection())
            .unwrap_err();
        assert!(matches!(err, ResolutionError::LockDisagreement { .. }));
    }

    #[test]
    fn test_extra_mechanism_command() {
        let manifest = DependencyManifest::parse("torch==2.3.1\n").unwrap();
        let resolver = UvResolver::new("/opt/venv");
        let sel = VariantSelection {
            ml_package: "torch".to_string(),
            mechanism: VariantMechanism::CpuExtra {
                group: "cpu".to_string(),
            },
        };
        let tree = resolver.resolve(&manifest, None, &sel).unwrap();
        assert!(tree.install_commands[1].contains("--group cpu"));
        assert!(!tree.install_commands[1].contains("--index-url"));
    }
}
