use crate::config::SERVICE_PORT;
use crate::manifest::MANIFEST_FILE;
use crate::output::schema::ImageSpec;
use anyhow::Result;

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, spec: &ImageSpec) -> Result<()>;
}

pub struct RequiredFieldsRule;

impl ValidationRule for RequiredFieldsRule {
    fn name(&self) -> &'static str {
        "RequiredFields"
    }

    fn validate(&self, spec: &ImageSpec) -> Result<()> {
        if spec.version.is_empty() {
            anyhow::bail!("Version cannot be empty");
        }
        if spec.builder.base.is_empty() {
            anyhow::bail!("Builder base image cannot be empty");
        }
        if spec.runtime.base.is_empty() {
            anyhow::bail!("Runtime base image cannot be empty");
        }
        if spec.builder.commands.is_empty() {
            anyhow::bail!("Builder install commands cannot be empty");
        }
        Ok(())
    }
}

/// Packages and paths that would mean toolchain or installer residue leaked
/// into the runtime closure.
const TOOLCHAIN_MARKERS: &[&str] = &["build-essential", "build-base", "gcc", "g++", "make"];
const INSTALLER_MARKERS: &[&str] = &["pip", "uv"];

pub struct RuntimeFreeOfToolchainRule;

impl ValidationRule for RuntimeFreeOfToolchainRule {
    fn name(&self) -> &'static str {
        "RuntimeFreeOfToolchain"
    }

    fn validate(&self, spec: &ImageSpec) -> Result<()> {
        for package in &spec.runtime.packages {
            if TOOLCHAIN_MARKERS.contains(&package.as_str()) {
                anyhow::bail!("Runtime stage must not carry toolchain package {:?}", package);
            }
            if INSTALLER_MARKERS.contains(&package.as_str()) {
                anyhow::bail!(
                    "Runtime stage must not carry package manager {:?}",
                    package
                );
            }
        }
        for copy in &spec.runtime.copy {
            if copy.from.contains("/.cache/") || copy.from.ends_with("/.cache") {
                anyhow::bail!(
                    "Runtime stage must not import cache directory {:?}",
                    copy.from
                );
            }
        }
        Ok(())
    }
}

pub struct SingleExposedPortRule;

impl ValidationRule for SingleExposedPortRule {
    fn name(&self) -> &'static str {
        "SingleExposedPort"
    }

    fn validate(&self, spec: &ImageSpec) -> Result<()> {
        if spec.runtime.ports != [SERVICE_PORT] {
            anyhow::bail!(
                "Image must expose exactly port {}, got {:?}",
                SERVICE_PORT,
                spec.runtime.ports
            );
        }
        Ok(())
    }
}

/// The layer-cache contract: dependency declarations enter the build before
/// any application source, and the artifact import precedes the app copy.
pub struct ManifestBeforeSourceRule;

impl ValidationRule for ManifestBeforeSourceRule {
    fn name(&self) -> &'static str {
        "ManifestBeforeSource"
    }

    fn validate(&self, spec: &ImageSpec) -> Result<()> {
        match spec.builder.context.first() {
            Some(first) if first.from.ends_with(MANIFEST_FILE) => {}
            other => anyhow::bail!(
                "Builder context must copy the dependency manifest first, got {:?}",
                other.map(|c| &c.from)
            ),
        }
        if spec
            .builder
            .context
            .iter()
            .any(|c| c.from == "." || c.from.starts_with("app"))
        {
            anyhow::bail!("Builder context must not include application source");
        }

        let artifact_pos = spec
            .runtime
            .copy
            .iter()
            .position(|c| c.from_stage.is_some());
        let source_pos = spec.runtime.copy.iter().position(|c| c.from == ".");
        match (artifact_pos, source_pos) {
            (Some(artifact), Some(source)) if artifact < source => Ok(()),
            _ => anyhow::bail!(
                "Runtime stage must copy the artifact tree before the application source"
            ),
        }
    }
}

pub struct HealthContractRule;

impl ValidationRule for HealthContractRule {
    fn name(&self) -> &'static str {
        "HealthContract"
    }

    fn validate(&self, spec: &ImageSpec) -> Result<()> {
        let health = spec
            .runtime
            .health
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Runtime stage must declare a healthcheck"))?;

        if health.interval_secs != 30 || health.timeout_secs != 3 || health.retries != 3 {
            anyhow::bail!(
                "Healthcheck must use the fixed contract values 30s/3s/3, got {}s/{}s/{}",
                health.interval_secs,
                health.timeout_secs,
                health.retries
            );
        }
        if !health.endpoint.contains("127.0.0.1") || !health.endpoint.ends_with("/health") {
            anyhow::bail!(
                "Healthcheck must probe the fixed local endpoint, got {:?}",
                health.endpoint
            );
        }
        Ok(())
    }
}

pub struct EntrypointRule;

impl ValidationRule for EntrypointRule {
    fn name(&self) -> &'static str {
        "Entrypoint"
    }

    fn validate(&self, spec: &ImageSpec) -> Result<()> {
        if spec.runtime.entrypoint.is_empty() {
            anyhow::bail!("Runtime entrypoint cannot be empty");
        }
        if !spec.runtime.entrypoint.iter().any(|a| a == "0.0.0.0") {
            anyhow::bail!("Entrypoint must bind 0.0.0.0");
        }
        if !spec
            .runtime
            .entrypoint
            .iter()
            .any(|a| a == &SERVICE_PORT.to_string())
        {
            anyhow::bail!("Entrypoint must bind port {}", SERVICE_PORT);
        }
        Ok(())
    }
}
