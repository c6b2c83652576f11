//! Output formatting for the image spec in JSON, YAML, and human-readable
//! text.

use anyhow::Result;
use std::fmt::Write;

use crate::cli::commands::OutputFormatArg;
use crate::output::schema::ImageSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Human => OutputFormat::Human,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, spec: &ImageSpec) -> Result<String> {
        match self.format {
            OutputFormat::Json => spec.to_json(),
            OutputFormat::Yaml => spec.to_yaml(),
            OutputFormat::Human => self.format_human(spec),
        }
    }

    fn format_human(&self, spec: &ImageSpec) -> Result<String> {
        let mut out = String::new();

        writeln!(out, "Image Build Plan")?;
        writeln!(out, "================")?;
        if let Some(name) = &spec.metadata.project_name {
            writeln!(out, "Project:    {}", name)?;
        }
        writeln!(out, "Build ID:   {}", spec.metadata.build_id)?;
        writeln!(out, "Resolver:   {}", spec.metadata.resolver)?;
        writeln!(out, "Variant:    {}", spec.metadata.variant)?;
        writeln!(out, "Cache key:  {}", spec.metadata.install_cache_key)?;
        writeln!(out)?;

        writeln!(out, "Builder stage ({})", spec.builder.base)?;
        writeln!(out, "  Toolchain:  {}", spec.builder.packages.join(", "))?;
        for context in &spec.builder.context {
            writeln!(out, "  Context:    {} -> {}", context.from, context.to)?;
        }
        for command in &spec.builder.commands {
            writeln!(out, "  Run:        {}", command)?;
        }
        writeln!(out, "  Artifacts:  {}", spec.builder.artifact_prefix)?;
        writeln!(out)?;

        writeln!(out, "Runtime stage ({})", spec.runtime.base)?;
        writeln!(out, "  Packages:   {}", spec.runtime.packages.join(", "))?;
        for copy in &spec.runtime.copy {
            match &copy.from_stage {
                Some(stage) => {
                    writeln!(out, "  Copy:       [{}] {} -> {}", stage, copy.from, copy.to)?
                }
                None => writeln!(out, "  Copy:       {} -> {}", copy.from, copy.to)?,
            }
        }
        writeln!(
            out,
            "  Ports:      {}",
            spec.runtime
                .ports
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        writeln!(out, "  Entrypoint: {}", spec.runtime.entrypoint.join(" "))?;
        if let Some(health) = &spec.runtime.health {
            writeln!(
                out,
                "  Health:     {} every {}s (timeout {}s, {} retries)",
                health.endpoint, health.interval_secs, health.timeout_secs, health.retries
            )?;
        }

        Ok(out)
    }
}
