use super::python_minor_from_image;
use crate::config::SERVICE_PORT;
use crate::error::BuildError;
use crate::health::{self, local_health_endpoint};
use crate::output::schema::{CopySpec, HealthCheckSpec, RuntimeStageSpec};
use crate::pipeline::context::BuildContext;
use crate::pipeline::phase_trait::BuildPhase;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// The only operational tooling the runtime image carries: the probe client.
const PROBE_CLIENT_PACKAGES: &[&str] = &["curl"];

const BUILDER_STAGE_NAME: &str = "builder";

/// Assembles the minimal deployable closure: base environment, the Builder
/// stage's artifact tree (read-only, copied wholesale), and the application
/// source. No toolchain and no package-manager residue cross this boundary.
pub struct RuntimePhase;

#[async_trait]
impl BuildPhase for RuntimePhase {
    fn name(&self) -> &'static str {
        "RuntimePhase"
    }

    async fn execute(&self, context: &mut BuildContext) -> Result<()> {
        let tree = context.tree.as_ref().ok_or(BuildError::IncompleteContext {
            phase: "RuntimePhase",
            missing: "installed artifact tree",
        })?;
        let base_env = context.base_env.as_ref().ok_or(BuildError::IncompleteContext {
            phase: "RuntimePhase",
            missing: "base environment",
        })?;

        let prefix = tree.prefix.display().to_string();
        let python_minor = python_minor_from_image(&context.config.base_image);

        let mut env: std::collections::BTreeMap<String, String> = base_env
            .vars()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.insert(
            "PYTHONPATH".to_string(),
            format!("{}/lib/python{}/site-packages", prefix, python_minor),
        );
        env.insert(
            "PATH".to_string(),
            format!("{}/bin:/usr/local/bin:/usr/bin:/bin", prefix),
        );

        let app_dir = context.config.app_dir.display().to_string();

        // Artifact tree first, application source last: app code churns the
        // most and must never invalidate the dependency layer.
        let copy = vec![
            CopySpec {
                from_stage: Some(BUILDER_STAGE_NAME.to_string()),
                from: prefix.clone(),
                to: prefix.clone(),
            },
            CopySpec {
                from_stage: None,
                from: ".".to_string(),
                to: app_dir.clone(),
            },
        ];

        let endpoint = local_health_endpoint();
        let health = HealthCheckSpec {
            endpoint: endpoint.clone(),
            command: vec!["curl".to_string(), "-f".to_string(), endpoint],
            interval_secs: health::PROBE_INTERVAL.as_secs(),
            timeout_secs: health::PROBE_TIMEOUT.as_secs(),
            retries: health::PROBE_RETRIES,
        };

        info!(port = SERVICE_PORT, workdir = %app_dir, "Runtime stage assembled");

        context.runtime = Some(RuntimeStageSpec {
            base: context.config.base_image.clone(),
            packages: PROBE_CLIENT_PACKAGES.iter().map(|p| p.to_string()).collect(),
            env,
            copy,
            workdir: app_dir,
            ports: vec![SERVICE_PORT],
            entrypoint: vec![
                "uvicorn".to_string(),
                "app.main:app".to_string(),
                "--host".to_string(),
                "0.0.0.0".to_string(),
                "--port".to_string(),
                SERVICE_PORT.to_string(),
            ],
            health: Some(health),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::fs::MockFileSystem;
    use crate::pipeline::phases::{BaseEnvPhase, BuilderPhase, ManifestPhase};
    use crate::resolve::FakeResolver;
    use std::path::Path;
    use std::sync::Arc;

    async fn run_through_runtime() -> RuntimeStageSpec {
        let fs = MockFileSystem::new();
        fs.add_file("requirements.txt", "torch==2.3.1\n");

        let mut context = BuildContext::new(
            Path::new("/mock"),
            PipelineConfig::default(),
            Arc::new(fs),
            Arc::new(FakeResolver::new("/opt/venv")),
        );
        BaseEnvPhase.execute(&mut context).await.unwrap();
        ManifestPhase.execute(&mut context).await.unwrap();
        BuilderPhase.execute(&mut context).await.unwrap();
        RuntimePhase.execute(&mut context).await.unwrap();
        context.runtime.unwrap()
    }

    #[tokio::test]
    async fn test_artifact_copy_precedes_app_source() {
        let runtime = run_through_runtime().await;
        assert_eq!(runtime.copy[0].from_stage.as_deref(), Some("builder"));
        assert_eq!(runtime.copy[0].from, "/opt/venv");
        assert!(runtime.copy[1].from_stage.is_none());
        assert_eq!(runtime.copy[1].from, ".");
    }

    #[tokio::test]
    async fn test_only_probe_client_tooling() {
        let runtime = run_through_runtime().await;
        assert_eq!(runtime.packages, vec!["curl".to_string()]);
    }

    #[tokio::test]
    async fn test_contract_metadata() {
        let runtime = run_through_runtime().await;
        assert_eq!(runtime.ports, vec![8000]);
        assert_eq!(runtime.entrypoint[0], "uvicorn");
        assert!(runtime.entrypoint.contains(&"0.0.0.0".to_string()));

        let health = runtime.health.unwrap();
        assert_eq!(health.interval_secs, 30);
        assert_eq!(health.timeout_secs, 3);
        assert_eq!(health.retries, 3);
        assert_eq!(health.endpoint, "http://127.0.0.1:8000/health");
    }

    #[tokio::test]
    async fn test_runtime_requires_builder_tree() {
        let fs = MockFileSystem::new();
        fs.add_file("requirements.txt", "torch==2.3.1\n");
        let mut context = BuildContext::new(
            Path::new("/mock"),
            PipelineConfig::default(),
            Arc::new(fs),
            Arc::new(FakeResolver::new("/opt/venv")),
        );
        BaseEnvPhase.execute(&mut context).await.unwrap();

        assert!(RuntimePhase.execute(&mut context).await.is_err());
    }
}
