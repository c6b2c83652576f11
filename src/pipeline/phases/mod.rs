pub mod assemble;
pub mod base_env;
pub mod builder;
pub mod manifest;
pub mod runtime;

pub use assemble::AssemblePhase;
pub use base_env::BaseEnvPhase;
pub use builder::BuilderPhase;
pub use manifest::ManifestPhase;
pub use runtime::RuntimePhase;

/// `python:3.12-slim` -> `3.12`. Falls back to the current default when the
/// image tag carries no version.
pub(crate) fn python_minor_from_image(image: &str) -> String {
    image
        .split(':')
        .nth(1)
        .and_then(|tag| {
            let version: String = tag
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            let mut parts = version.split('.').filter(|p| !p.is_empty());
            match (parts.next(), parts.next()) {
                (Some(major), Some(minor)) => Some(format!("{}.{}", major, minor)),
                _ => None,
            }
        })
        .unwrap_or_else(|| "3.12".to_string())
}
