use crate::resolve::VariantMechanism;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_BASE_IMAGE: &str = "python:3.12-slim";
const DEFAULT_INSTALL_PREFIX: &str = "/opt/venv";
const DEFAULT_ML_PACKAGE: &str = "torch";
const DEFAULT_CPU_INDEX_URL: &str = "https://download.pytorch.org/whl/cpu";
const DEFAULT_APP_DIR: &str = "/app";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_STRICT_CPU: bool = true;

/// Port 8000 and the `/health` path are fixed contract values shared with the
/// orchestrator; they are constants rather than configuration.
pub const SERVICE_PORT: u16 = 8000;
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("both LAYERCAKE_CPU_INDEX_URL and LAYERCAKE_CPU_EXTRA are set; exactly one CPU variant mechanism must be active per build")]
    AmbiguousVariantMechanism,

    #[error("failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Interpreter-level flags fixed once and inherited by every stage, so both
/// stages observe identical behavior. Modeled as an explicit immutable record
/// rather than ambient process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseEnvironment {
    vars: BTreeMap<String, String>,
}

impl BaseEnvironment {
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

impl Default for BaseEnvironment {
    fn default() -> Self {
        let mut vars = BTreeMap::new();
        // No bytecode cache files in any layer.
        vars.insert("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string());
        // Unbuffered stdout/stderr for reliable log capture.
        vars.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());
        // Installer must never prompt.
        vars.insert("PIP_NO_INPUT".to_string(), "1".to_string());
        vars.insert(
            "PIP_DISABLE_PIP_VERSION_CHECK".to_string(),
            "1".to_string(),
        );
        // The container is the isolation boundary; no implicit virtualenv.
        vars.insert("UV_SYSTEM_PYTHON".to_string(), "1".to_string());
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub base_image: String,
    pub install_prefix: PathBuf,
    pub ml_package: String,
    pub app_dir: PathBuf,
    pub strict_cpu: bool,
    pub log_level: String,
    pub base_env: BaseEnvironment,
    cpu_index_url: Option<String>,
    cpu_extra: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let base_image =
            env::var("LAYERCAKE_BASE_IMAGE").unwrap_or_else(|_| DEFAULT_BASE_IMAGE.to_string());

        let install_prefix = env::var("LAYERCAKE_INSTALL_PREFIX")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_INSTALL_PREFIX));

        let ml_package =
            env::var("LAYERCAKE_ML_PACKAGE").unwrap_or_else(|_| DEFAULT_ML_PACKAGE.to_string());

        let app_dir = env::var("LAYERCAKE_APP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_APP_DIR));

        let strict_cpu = env::var("LAYERCAKE_STRICT_CPU")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_STRICT_CPU);

        let log_level = env::var("LAYERCAKE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let cpu_index_url = env::var("LAYERCAKE_CPU_INDEX_URL").ok();
        let cpu_extra = env::var("LAYERCAKE_CPU_EXTRA").ok();

        Self {
            base_image,
            install_prefix,
            ml_package,
            app_dir,
            strict_cpu,
            log_level,
            base_env: BaseEnvironment::default(),
            cpu_index_url,
            cpu_extra,
        }
    }
}

impl PipelineConfig {
    /// Selects the single active CPU variant mechanism for this build.
    ///
    /// The alternate package source is authoritative when nothing is
    /// configured. Requesting both mechanisms at once is a configuration
    /// error, never a silent fallback.
    pub fn variant_mechanism(&self) -> Result<VariantMechanism, ConfigError> {
        match (&self.cpu_index_url, &self.cpu_extra) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousVariantMechanism),
            (None, Some(group)) => Ok(VariantMechanism::CpuExtra {
                group: group.clone(),
            }),
            (Some(url), None) => Ok(VariantMechanism::CpuIndex { url: url.clone() }),
            (None, None) => Ok(VariantMechanism::CpuIndex {
                url: DEFAULT_CPU_INDEX_URL.to_string(),
            }),
        }
    }

    pub fn with_cpu_index_url(mut self, url: impl Into<String>) -> Self {
        self.cpu_index_url = Some(url.into());
        self
    }

    pub fn with_cpu_extra(mut self, group: impl Into<String>) -> Self {
        self.cpu_extra = Some(group.into());
        self
    }
}
