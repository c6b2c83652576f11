//! Containerfile emission.
//!
//! One parameterized renderer serves every variant mechanism; the mechanism
//! only changes the install command already baked into the spec, so the two
//! historical near-duplicate recipes cannot drift apart again.

use crate::error::BuildError;
use crate::output::schema::ImageSpec;
use std::collections::BTreeMap;
use std::fmt::Write;

const BASE_STAGE: &str = "base";
const BUILDER_STAGE: &str = "builder";

pub struct ContainerfileRenderer;

impl Default for ContainerfileRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerfileRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, spec: &ImageSpec) -> Result<String, BuildError> {
        if spec.builder.base.is_empty() || spec.runtime.base.is_empty() {
            return Err(BuildError::Render("stage base image missing".to_string()));
        }
        if spec.runtime.entrypoint.is_empty() {
            return Err(BuildError::Render("entrypoint missing".to_string()));
        }
        if spec.builder.base != spec.runtime.base {
            return Err(BuildError::Render(format!(
                "stages must share one base image, got {} and {}",
                spec.builder.base, spec.runtime.base
            )));
        }

        // Flags identical in both stages belong to the shared base stage.
        let shared: BTreeMap<&String, &String> = spec
            .builder
            .env
            .iter()
            .filter(|(k, v)| spec.runtime.env.get(*k) == Some(*v))
            .collect();

        let mut out = String::new();
        let w = &mut out;

        writeln!(w, "# syntax=docker/dockerfile:1").ok();
        writeln!(w).ok();

        // Base: interpreter flags fixed once, inherited by both stages.
        writeln!(w, "FROM {} AS {}", spec.builder.base, BASE_STAGE).ok();
        for (key, value) in &shared {
            writeln!(w, "ENV {}={}", key, value).ok();
        }
        writeln!(w).ok();

        // Builder: toolchain, manifest-first context, install, purge.
        writeln!(w, "FROM {} AS {}", BASE_STAGE, BUILDER_STAGE).ok();
        self.render_env_delta(w, &spec.builder.env, &shared);
        if !spec.builder.packages.is_empty() {
            writeln!(
                w,
                "RUN apt-get update && apt-get install -y --no-install-recommends {} && rm -rf /var/lib/apt/lists/*",
                spec.builder.packages.join(" ")
            )
            .ok();
        }
        writeln!(w, "WORKDIR /build").ok();
        for context in &spec.builder.context {
            writeln!(w, "COPY {} {}", context.from, context.to).ok();
        }
        for command in &spec.builder.commands {
            writeln!(w, "RUN {}", command).ok();
        }
        if !spec.builder.cache_purge.is_empty() {
            writeln!(w, "RUN rm -rf {}", spec.builder.cache_purge.join(" ")).ok();
        }
        writeln!(w).ok();

        // Runtime: probe client, artifact import, app source last.
        writeln!(w, "FROM {} AS runtime", BASE_STAGE).ok();
        self.render_env_delta(w, &spec.runtime.env, &shared);
        if !spec.runtime.packages.is_empty() {
            writeln!(
                w,
                "RUN apt-get update && apt-get install -y --no-install-recommends {} && rm -rf /var/lib/apt/lists/*",
                spec.runtime.packages.join(" ")
            )
            .ok();
        }
        for copy in &spec.runtime.copy {
            match &copy.from_stage {
                Some(stage) => {
                    writeln!(w, "COPY --from={} {} {}", stage, copy.from, copy.to).ok();
                }
                None => {
                    writeln!(w, "COPY {} {}", copy.from, copy.to).ok();
                }
            }
        }
        if !spec.runtime.workdir.is_empty() {
            writeln!(w, "WORKDIR {}", spec.runtime.workdir).ok();
        }
        for port in &spec.runtime.ports {
            writeln!(w, "EXPOSE {}", port).ok();
        }
        if let Some(health) = &spec.runtime.health {
            writeln!(
                w,
                "HEALTHCHECK --interval={}s --timeout={}s --retries={} CMD {} || exit 1",
                health.interval_secs,
                health.timeout_secs,
                health.retries,
                health.command.join(" ")
            )
            .ok();
        }
        writeln!(w, "CMD [{}]", render_exec_form(&spec.runtime.entrypoint)).ok();

        Ok(out)
    }

    fn render_env_delta(
        &self,
        w: &mut String,
        env: &BTreeMap<String, String>,
        shared: &BTreeMap<&String, &String>,
    ) {
        for (key, value) in env {
            if shared.get(key) != Some(&value) {
                writeln!(w, "ENV {}={}", key, value).ok();
            }
        }
    }
}

fn render_exec_form(argv: &[String]) -> String {
    argv.iter()
        .map(|a| format!("\"{}\"", a))
        .collect::<Vec<_>>()
        .join(", ")
}
