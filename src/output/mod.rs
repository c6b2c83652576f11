pub mod schema;

pub use schema::{
    BuilderStageSpec, ContextSpec, CopySpec, HealthCheckSpec, ImageMetadata, ImageSpec,
    RuntimeStageSpec,
};
