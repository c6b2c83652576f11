use super::python_minor_from_image;
use crate::error::BuildError;
use crate::manifest::{LOCK_FILE, MANIFEST_FILE};
use crate::output::schema::{BuilderStageSpec, ContextSpec};
use crate::pipeline::context::BuildContext;
use crate::pipeline::phase_trait::BuildPhase;
use crate::verify;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Compiler toolchain for native extension builds. Lives only in this stage
/// and is never copied forward.
const TOOLCHAIN_PACKAGES: &[&str] = &["build-essential"];

const BUILD_DIR: &str = "/build";

/// Turns the Dependency Manifest into the Installed Artifact Tree: toolchain
/// install, resolver invocation against the CPU-only variant, cache purge,
/// and the post-install verification of the ML runtime.
pub struct BuilderPhase;

#[async_trait]
impl BuildPhase for BuilderPhase {
    fn name(&self) -> &'static str {
        "BuilderPhase"
    }

    async fn execute(&self, context: &mut BuildContext) -> Result<()> {
        let manifest = context.manifest.as_ref().ok_or(BuildError::IncompleteContext {
            phase: "BuilderPhase",
            missing: "manifest",
        })?;
        let selection = context
            .selection
            .as_ref()
            .ok_or(BuildError::IncompleteContext {
                phase: "BuilderPhase",
                missing: "variant selection",
            })?;
        let base_env = context.base_env.as_ref().ok_or(BuildError::IncompleteContext {
            phase: "BuilderPhase",
            missing: "base environment",
        })?;

        let tree = context
            .resolver
            .resolve(manifest, context.lock.as_ref(), selection)
            .map_err(BuildError::Resolution)?;

        info!(
            resolver = context.resolver.name(),
            packages = tree.packages.len(),
            prefix = %tree.prefix.display(),
            "Builder stage resolved the installed artifact tree"
        );

        // Manifest and lock enter the context before any application source;
        // this ordering is the cache contract, not a style choice.
        let mut stage_context = vec![ContextSpec {
            from: MANIFEST_FILE.to_string(),
            to: format!("{}/{}", BUILD_DIR, MANIFEST_FILE),
        }];
        if context.lock.is_some() {
            stage_context.push(ContextSpec {
                from: LOCK_FILE.to_string(),
                to: format!("{}/{}", BUILD_DIR, LOCK_FILE),
            });
        }

        let mut commands = tree.install_commands.clone();
        commands.push(verify::report_command(&selection.ml_package));
        if context.config.strict_cpu {
            commands.push(verify::assert_cpu_only_command(&selection.ml_package));
        }

        // The verification layers import the ML runtime from the install
        // prefix, so the interpreter must see it in this stage too.
        let python_minor = python_minor_from_image(&context.config.base_image);
        let mut env: std::collections::BTreeMap<String, String> = base_env
            .vars()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.insert(
            "PYTHONPATH".to_string(),
            format!(
                "{}/lib/python{}/site-packages",
                tree.prefix.display(),
                python_minor
            ),
        );

        context.builder = Some(BuilderStageSpec {
            base: context.config.base_image.clone(),
            packages: TOOLCHAIN_PACKAGES.iter().map(|p| p.to_string()).collect(),
            env,
            context: stage_context,
            commands,
            cache_purge: tree.cache_paths.clone(),
            artifact_prefix: tree.prefix.display().to_string(),
        });
        context.tree = Some(tree);
        Ok(())
    }
}
