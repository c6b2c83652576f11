use super::context::BuildContext;
use super::phase_trait::BuildPhase;
use super::phases::{AssemblePhase, BaseEnvPhase, BuilderPhase, ManifestPhase, RuntimePhase};
use crate::error::BuildError;
use crate::output::schema::ImageSpec;
use crate::validation::Validator;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::info;

/// Runs the stage-construction phases as a strictly ordered pipeline and
/// validates the result. The declared stage graph is a DAG a compliant
/// build engine may parallelize; this orchestrator itself stays sequential
/// because the Runtime phase consumes the Builder phase's artifact tree.
pub struct PipelineOrchestrator;

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOrchestrator {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, context: &mut BuildContext) -> Result<ImageSpec> {
        let start = Instant::now();
        info!(repo = %context.repo_path.display(), "Starting build pipeline");

        let phases: Vec<Box<dyn BuildPhase>> = vec![
            Box::new(BaseEnvPhase),
            Box::new(ManifestPhase),
            Box::new(BuilderPhase),
            Box::new(RuntimePhase),
            Box::new(AssemblePhase),
        ];

        for phase in phases {
            let phase_name = phase.name();
            let phase_start = Instant::now();

            phase
                .execute(context)
                .await
                .with_context(|| format!("Phase {} failed", phase_name))?;

            info!(
                phase = %phase_name,
                duration_ms = phase_start.elapsed().as_millis(),
                "Phase complete"
            );
        }

        let image = context.image.take().ok_or(BuildError::IncompleteContext {
            phase: "AssemblePhase",
            missing: "image spec",
        })?;

        Validator::default()
            .validate(&image)
            .context("Assembled image spec failed validation")?;

        info!(
            build_id = %image.metadata.build_id,
            total_time_ms = start.elapsed().as_millis(),
            "Build pipeline complete"
        );

        Ok(image)
    }
}
