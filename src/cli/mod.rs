pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, PlanArgs, ProbeArgs, RenderArgs, VerifyArgs};
pub use output::{OutputFormat, OutputFormatter};
