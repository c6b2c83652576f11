use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

fn default_version() -> String {
    "1.0".to_string()
}

/// The terminal, deployable description of one build invocation: the stage
/// closure plus the declared image metadata an orchestrator consumes.
/// Immutable after assembly; a new build supersedes it rather than mutating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSpec {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub metadata: ImageMetadata,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub builder: BuilderStageSpec,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub runtime: RuntimeStageSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub build_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub resolver: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub variant: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub install_cache_key: String,
}

/// Builder stage: toolchain + install. Context entries are ordered; the
/// manifest and lock come first so the install layer's cache key never sees
/// application source.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuilderStageSpec {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub base: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub packages: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub env: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub context: Vec<ContextSpec>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub commands: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub cache_purge: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub artifact_prefix: String,
}

/// Runtime stage: probe client, artifact copy, app source, and the runtime
/// behavioral contract (port, healthcheck, entrypoint).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeStageSpec {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub base: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub packages: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub env: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub copy: Vec<CopySpec>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub workdir: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub ports: Vec<u16>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub entrypoint: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthCheckSpec>,
}

/// Build-context copy into the Builder stage.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContextSpec {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub from: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub to: String,
}

/// Copy into the Runtime stage. `from_stage` marks the cross-stage artifact
/// import; `None` copies from the build context.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CopySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_stage: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub from: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheckSpec {
    pub endpoint: String,
    pub command: Vec<String>,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl fmt::Display for ImageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_yaml() {
            Ok(yaml) => write!(f, "{}", yaml),
            Err(e) => write!(f, "Error formatting ImageSpec: {}", e),
        }
    }
}

impl ImageSpec {
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize ImageSpec to YAML")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize ImageSpec to JSON")
    }
}
