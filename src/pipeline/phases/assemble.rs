use crate::error::BuildError;
use crate::output::schema::{ImageMetadata, ImageSpec};
use crate::pipeline::context::BuildContext;
use crate::pipeline::phase_trait::BuildPhase;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Seals the build into the terminal `ImageSpec`. After this phase the spec
/// is immutable; a rebuild produces a new one with a fresh build id.
pub struct AssemblePhase;

#[async_trait]
impl BuildPhase for AssemblePhase {
    fn name(&self) -> &'static str {
        "AssemblePhase"
    }

    async fn execute(&self, context: &mut BuildContext) -> Result<()> {
        let builder = context.builder.take().ok_or(BuildError::IncompleteContext {
            phase: "AssemblePhase",
            missing: "builder stage",
        })?;
        let runtime = context.runtime.take().ok_or(BuildError::IncompleteContext {
            phase: "AssemblePhase",
            missing: "runtime stage",
        })?;
        let selection = context
            .selection
            .as_ref()
            .ok_or(BuildError::IncompleteContext {
                phase: "AssemblePhase",
                missing: "variant selection",
            })?;
        let cache_key = context
            .cache_key
            .clone()
            .ok_or(BuildError::IncompleteContext {
                phase: "AssemblePhase",
                missing: "install cache key",
            })?;

        let build_id = uuid::Uuid::new_v4().to_string();
        info!(build_id = %build_id, "Assembled image spec");

        context.image = Some(ImageSpec {
            version: "1.0".to_string(),
            metadata: ImageMetadata {
                project_name: Some(context.project_name()),
                build_id,
                created_at: Some(chrono::Utc::now()),
                resolver: context.resolver.name().to_string(),
                variant: selection.mechanism.fingerprint(),
                install_cache_key: cache_key,
            },
            builder,
            runtime,
        });
        Ok(())
    }
}
