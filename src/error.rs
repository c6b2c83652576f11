use std::path::PathBuf;
use thiserror::Error;

/// Fatal dependency-resolution failures. These abort the build before any
/// runtime stage is assembled.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("manifest pins {package} at {manifest_version} but the lock file resolved {lock_version}")]
    LockDisagreement {
        package: String,
        manifest_version: String,
        lock_version: String,
    },

    #[error("package {package} is pinned in the manifest but missing from the lock file")]
    MissingFromLock { package: String },

    #[error("ML runtime package {package} is not declared in the manifest")]
    MissingRuntimePackage { package: String },

    #[error("unparseable requirement on line {line}: {text:?}")]
    MalformedRequirement { line: usize, text: String },

    #[error("dependency resolution conflict: {0}")]
    Conflict(String),
}

/// Raised when the CPU-only constraint cannot be honored.
#[derive(Debug, Error)]
pub enum VariantError {
    #[error(
        "CPU-only build required but {package} {version} reports an accelerator backend available"
    )]
    AcceleratorPresent { package: String, version: String },

    #[error("verification output could not be parsed: {0:?}")]
    UnparseableReport(String),
}

/// Top-level build failure taxonomy. Probe failures are deliberately absent:
/// liveness is a state transition surfaced to the orchestrator, not an error
/// of this pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Variant(#[from] VariantError),

    #[error("failed to read {path}: {message}")]
    ManifestIo { path: PathBuf, message: String },

    #[error("phase {phase} left the build context incomplete: {missing}")]
    IncompleteContext {
        phase: &'static str,
        missing: &'static str,
    },

    #[error("failed to render Containerfile: {0}")]
    Render(String),
}
