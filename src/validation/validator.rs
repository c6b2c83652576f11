use crate::output::schema::ImageSpec;
use crate::validation::rules::{
    EntrypointRule, HealthContractRule, ManifestBeforeSourceRule, RequiredFieldsRule,
    RuntimeFreeOfToolchainRule, SingleExposedPortRule, ValidationRule,
};
use anyhow::Result;

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    pub fn validate(&self, spec: &ImageSpec) -> Result<()> {
        for rule in &self.rules {
            if let Err(e) = rule.validate(spec) {
                anyhow::bail!("[{}] {}", rule.name(), e);
            }
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredFieldsRule),
                Box::new(RuntimeFreeOfToolchainRule),
                Box::new(SingleExposedPortRule),
                Box::new(ManifestBeforeSourceRule),
                Box::new(HealthContractRule),
                Box::new(EntrypointRule),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::schema::{
        BuilderStageSpec, ContextSpec, CopySpec, HealthCheckSpec, ImageMetadata, ImageSpec,
        RuntimeStageSpec,
    };
    use std::collections::BTreeMap;

    fn create_valid_spec() -> ImageSpec {
        ImageSpec {
            version: "1.0".to_string(),
            metadata: ImageMetadata::default(),
            builder: BuilderStageSpec {
                base: "python:3.12-slim".to_string(),
                packages: vec!["build-essential".to_string()],
                env: BTreeMap::new(),
                context: vec![
                    ContextSpec {
                        from: "requirements.txt".to_string(),
                        to: "/build/requirements.txt".to_string(),
                    },
                    ContextSpec {
                        from: "requirements.lock".to_string(),
                        to: "/build/requirements.lock".to_string(),
                    },
                ],
                commands: vec!["uv pip install -r requirements.lock".to_string()],
                cache_purge: vec!["/root/.cache/uv".to_string()],
                artifact_prefix: "/opt/venv".to_string(),
            },
            runtime: RuntimeStageSpec {
                base: "python:3.12-slim".to_string(),
                packages: vec!["curl".to_string()],
                env: BTreeMap::new(),
                copy: vec![
                    CopySpec {
                        from_stage: Some("builder".to_string()),
                        from: "/opt/venv".to_string(),
                        to: "/opt/venv".to_string(),
                    },
                    CopySpec {
                        from_stage: None,
                        from: ".".to_string(),
                        to: "/app".to_string(),
                    },
                ],
                workdir: "/app".to_string(),
                ports: vec![8000],
                entrypoint: vec![
                    "uvicorn".to_string(),
                    "app.main:app".to_string(),
                    "--host".to_string(),
                    "0.0.0.0".to_string(),
                    "--port".to_string(),
                    "8000".to_string(),
                ],
                health: Some(HealthCheckSpec {
                    endpoint: "http://127.0.0.1:8000/health".to_string(),
                    command: vec![
                        "curl".to_string(),
                        "-f".to_string(),
                        "http://127.0.0.1:8000/health".to_string(),
                    ],
                    interval_secs: 30,
                    timeout_secs: 3,
                    retries: 3,
                }),
            },
        }
    }

    #[test]
    fn test_valid_spec_passes() {
        assert!(Validator::default().validate(&create_valid_spec()).is_ok());
    }

    #[test]
    fn test_toolchain_in_runtime_fails() {
        let mut spec = create_valid_spec();
        spec.runtime.packages.push("gcc".to_string());
        let err = Validator::default().validate(&spec).unwrap_err();
        assert!(err.to_string().contains("RuntimeFreeOfToolchain"));
    }

    #[test]
    fn test_package_manager_in_runtime_fails() {
        let mut spec = create_valid_spec();
        spec.runtime.packages.push("pip".to_string());
        assert!(Validator::default().validate(&spec).is_err());
    }

    #[test]
    fn test_cache_copy_into_runtime_fails() {
        let mut spec = create_valid_spec();
        spec.runtime.copy.push(CopySpec {
            from_stage: Some("builder".to_string()),
            from: "/root/.cache/uv".to_string(),
            to: "/root/.cache/uv".to_string(),
        });
        assert!(Validator::default().validate(&spec).is_err());
    }

    #[test]
    fn test_wrong_port_set_fails() {
        let mut spec = create_valid_spec();
        spec.runtime.ports = vec![8000, 9090];
        let err = Validator::default().validate(&spec).unwrap_err();
        assert!(err.to_string().contains("SingleExposedPort"));
    }

    #[test]
    fn test_app_source_in_builder_context_fails() {
        let mut spec = create_valid_spec();
        spec.builder.context.push(ContextSpec {
            from: ".".to_string(),
            to: "/build".to_string(),
        });
        let err = Validator::default().validate(&spec).unwrap_err();
        assert!(err.to_string().contains("ManifestBeforeSource"));
    }

    #[test]
    fn test_source_before_artifacts_fails() {
        let mut spec = create_valid_spec();
        spec.runtime.copy.reverse();
        assert!(Validator::default().validate(&spec).is_err());
    }

    #[test]
    fn test_drifted_health_contract_fails() {
        let mut spec = create_valid_spec();
        spec.runtime.health.as_mut().unwrap().interval_secs = 10;
        let err = Validator::default().validate(&spec).unwrap_err();
        assert!(err.to_string().contains("HealthContract"));
    }

    #[test]
    fn test_missing_healthcheck_fails() {
        let mut spec = create_valid_spec();
        spec.runtime.health = None;
        assert!(Validator::default().validate(&spec).is_err());
    }
}
