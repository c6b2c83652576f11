use crate::error::BuildError;
use crate::manifest::{self, DependencyManifest, LockFile, LOCK_FILE, MANIFEST_FILE};
use crate::pipeline::context::BuildContext;
use crate::pipeline::phase_trait::BuildPhase;
use crate::resolve::VariantSelection;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

/// Loads the manifest and lock file, and nothing else. Application source
/// is deliberately untouched here so the install-layer cache key depends
/// only on the dependency declaration.
pub struct ManifestPhase;

#[async_trait]
impl BuildPhase for ManifestPhase {
    fn name(&self) -> &'static str {
        "ManifestPhase"
    }

    async fn execute(&self, context: &mut BuildContext) -> Result<()> {
        let manifest_path = context.repo_path.join(MANIFEST_FILE);
        let content =
            context
                .fs
                .read_to_string(&manifest_path)
                .map_err(|e| BuildError::ManifestIo {
                    path: manifest_path.clone(),
                    message: e.to_string(),
                })?;
        let manifest = DependencyManifest::parse(&content).map_err(BuildError::Resolution)?;

        let lock_path = context.repo_path.join(LOCK_FILE);
        let lock = if context.fs.exists(&lock_path) {
            let content =
                context
                    .fs
                    .read_to_string(&lock_path)
                    .map_err(|e| BuildError::ManifestIo {
                        path: lock_path.clone(),
                        message: e.to_string(),
                    })?;
            Some(LockFile::parse(&content).map_err(BuildError::Resolution)?)
        } else {
            None
        };

        let mechanism = context.config.variant_mechanism()?;
        let selection = VariantSelection {
            ml_package: context.config.ml_package.clone(),
            mechanism,
        };

        let cache_key = manifest::install_cache_key(&manifest, lock.as_ref(), &selection.mechanism);
        info!(
            pins = manifest.requirements.len(),
            locked = lock.is_some(),
            cache_key = %cache_key,
            "Loaded dependency manifest"
        );
        debug!(variant = %selection.mechanism.fingerprint(), "Variant selection fixed");

        context.manifest = Some(manifest);
        context.lock = lock;
        context.selection = Some(selection);
        context.cache_key = Some(cache_key);
        Ok(())
    }
}
