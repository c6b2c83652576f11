//! layercake - parameterized multi-stage container builds for CPU-only
//! Python ML services
//!
//! This library models the build pipeline that packages a Python web service
//! with a heavy ML runtime dependency into a minimal, reproducible, layered
//! container image: a builder stage that resolves and installs the CPU-only
//! variant of the runtime behind a cache-friendly layer contract, and a slim
//! runtime stage carrying only the installed artifacts, the application
//! source, and a health probe client.
//!
//! # Core Concepts
//!
//! - **Dependency Manifest**: version-pinned package list plus a lock file;
//!   the two must agree on resolved versions, and together they key the
//!   install layer's cache.
//! - **Resolver**: narrow interface over the external package manager
//!   (`resolve(manifest, lock, selection) -> InstalledTree`), so pipeline
//!   properties are testable against a fake.
//! - **Variant mechanism**: exactly one way per build of steering the ML
//!   runtime to its CPU-only build - an alternate wheel index or an
//!   install-mode group - with ambiguity rejected at configuration time.
//! - **Stages**: Base fixes interpreter flags once; Builder owns the
//!   toolchain and the artifact tree; Runtime imports the artifacts
//!   read-only and declares the port/healthcheck/entrypoint contract.
//!
//! # Example Usage
//!
//! ```ignore
//! use layercake::config::PipelineConfig;
//! use layercake::fs::RealFileSystem;
//! use layercake::pipeline::{BuildContext, PipelineOrchestrator};
//! use layercake::render::ContainerfileRenderer;
//! use layercake::resolve::UvResolver;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! async fn render(service: &Path) -> anyhow::Result<String> {
//!     let config = PipelineConfig::default();
//!     let prefix = config.install_prefix.clone();
//!     let mut context = BuildContext::new(
//!         service,
//!         config,
//!         Arc::new(RealFileSystem::new()),
//!         Arc::new(UvResolver::new(prefix)),
//!     );
//!     let image = PipelineOrchestrator::new().execute(&mut context).await?;
//!     Ok(ContainerfileRenderer::new().render(&image)?)
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod health;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod resolve;
pub mod validation;
pub mod verify;

pub use config::{BaseEnvironment, ConfigError, PipelineConfig};
pub use error::{BuildError, ResolutionError, VariantError};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use health::{HealthMonitor, HealthState, HttpProbe, Probe, ProbeConfig};
pub use manifest::{DependencyManifest, LockFile};
pub use output::schema::ImageSpec;
pub use pipeline::{BuildContext, PipelineOrchestrator};
pub use render::ContainerfileRenderer;
pub use resolve::{
    CachingResolver, FakeResolver, InstalledTree, Resolver, UvResolver, VariantMechanism,
};
pub use validation::Validator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
