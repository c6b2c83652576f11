use super::{InstalledTree, Resolver, VariantSelection};
use crate::error::ResolutionError;
use crate::manifest::{self, DependencyManifest, LockFile};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Memoizes resolution on the install-layer cache key: an unchanged
/// manifest/lock/mechanism triple replays the stored tree instead of
/// invoking the package manager again, the same way a build engine replays
/// a cached install layer.
pub struct CachingResolver<R> {
    inner: R,
    cache: Mutex<HashMap<String, InstalledTree>>,
}

impl<R: Resolver> CachingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: Resolver> Resolver for CachingResolver<R> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn resolve(
        &self,
        manifest: &DependencyManifest,
        lock: Option<&LockFile>,
        selection: &VariantSelection,
    ) -> Result<InstalledTree, ResolutionError> {
        let key = manifest::install_cache_key(manifest, lock, &selection.mechanism);

        if let Some(tree) = self.cache.lock().unwrap().get(&key) {
            debug!(cache_key = %key, "Install layer cache hit; replaying resolved tree");
            return Ok(tree.clone());
        }

        let tree = self.inner.resolve(manifest, lock, selection)?;
        self.cache.lock().unwrap().insert(key, tree.clone());
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{FakeResolver, VariantMechanism};

    fn selection(mechanism: VariantMechanism) -> VariantSelection {
        VariantSelection {
            ml_package: "torch".to_string(),
            mechanism,
        }
    }

    fn cpu_index() -> VariantMechanism {
        VariantMechanism::CpuIndex {
            url: "https://download.pytorch.org/whl/cpu".to_string(),
        }
    }

    #[test]
    fn test_identical_inputs_resolve_once() {
        let resolver = CachingResolver::new(FakeResolver::new("/opt/venv"));
        let manifest = DependencyManifest::parse("torch==2.3.1\n").unwrap();
        let sel = selection(cpu_index());

        let first = resolver.resolve(&manifest, None, &sel).unwrap();
        let second = resolver.resolve(&manifest, None, &sel).unwrap();

        assert_eq!(resolver.inner().call_count(), 1);
        assert_eq!(first.cache_key, second.cache_key);
        assert_eq!(first.packages, second.packages);
    }

    #[test]
    fn test_mechanism_change_busts_the_cache() {
        let resolver = CachingResolver::new(FakeResolver::new("/opt/venv"));
        let manifest = DependencyManifest::parse("torch==2.3.1\n").unwrap();

        resolver
            .resolve(&manifest, None, &selection(cpu_index()))
            .unwrap();
        resolver
            .resolve(
                &manifest,
                None,
                &selection(VariantMechanism::CpuExtra {
                    group: "cpu".to_string(),
                }),
            )
            .unwrap();

        assert_eq!(resolver.inner().call_count(), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let resolver = CachingResolver::new(FakeResolver::failing_with("/opt/venv", "conflict"));
        let manifest = DependencyManifest::parse("torch==2.3.1\n").unwrap();
        let sel = selection(cpu_index());

        assert!(resolver.resolve(&manifest, None, &sel).is_err());
        assert!(resolver.resolve(&manifest, None, &sel).is_err());
        assert_eq!(resolver.inner().call_count(), 2);
    }
}
