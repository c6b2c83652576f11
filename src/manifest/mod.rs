//! Dependency Manifest and lock file.
//!
//! The manifest format itself is owned by the external package manager; this
//! module parses just enough of it to enforce the reproducibility invariant
//! (manifest and lock agree on resolved versions) and to derive the
//! install-layer cache key.

use crate::error::ResolutionError;
use crate::resolve::VariantMechanism;
use sha2::{Digest, Sha256};
use tracing::warn;

pub const MANIFEST_FILE: &str = "requirements.txt";
pub const LOCK_FILE: &str = "requirements.lock";

/// One declared package. `version` is present only for exact (`==`) pins;
/// range constraints are carried verbatim and left to the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub version: Option<String>,
    pub raw: String,
}

impl Requirement {
    fn parse(line: &str, line_no: usize) -> Result<Self, ResolutionError> {
        // Environment markers and inline comments do not affect identity.
        let spec = line
            .split(';')
            .next()
            .unwrap_or("")
            .split('#')
            .next()
            .unwrap_or("")
            .trim();

        let (name_part, version) = match spec.split_once("==") {
            Some((name, version)) => (name.trim(), Some(version.trim().to_string())),
            None => {
                let name_end = spec
                    .find(|c| "<>!~= ".contains(c))
                    .unwrap_or(spec.len());
                (spec[..name_end].trim(), None)
            }
        };

        // Extras belong to the same distribution.
        let name = name_part.split('[').next().unwrap_or("").trim();
        if name.is_empty() {
            return Err(ResolutionError::MalformedRequirement {
                line: line_no,
                text: line.to_string(),
            });
        }

        Ok(Self {
            name: normalize_name(name),
            version,
            raw: spec.to_string(),
        })
    }
}

/// PEP 503 normalization so `Torch` and `torch` compare equal.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}

#[derive(Debug, Clone)]
pub struct DependencyManifest {
    pub requirements: Vec<Requirement>,
    raw: String,
}

impl DependencyManifest {
    pub fn parse(content: &str) -> Result<Self, ResolutionError> {
        let requirements = parse_requirement_lines(content)?;
        Ok(Self {
            requirements,
            raw: content.to_string(),
        })
    }

    pub fn find(&self, package: &str) -> Option<&Requirement> {
        let wanted = normalize_name(package);
        self.requirements.iter().find(|r| r.name == wanted)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Fully pinned resolution output. Transitive dependencies make it a strict
/// superset of the manifest.
#[derive(Debug, Clone)]
pub struct LockFile {
    pub pins: Vec<Requirement>,
    raw: String,
}

impl LockFile {
    pub fn parse(content: &str) -> Result<Self, ResolutionError> {
        let pins = parse_requirement_lines(content)?;
        Ok(Self {
            pins,
            raw: content.to_string(),
        })
    }

    pub fn find(&self, package: &str) -> Option<&Requirement> {
        let wanted = normalize_name(package);
        self.pins.iter().find(|r| r.name == wanted)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn parse_requirement_lines(content: &str) -> Result<Vec<Requirement>, ResolutionError> {
    let mut requirements = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        // `--` lines are installer options (index urls, hash continuations),
        // not package identity.
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("--") {
            continue;
        }
        requirements.push(Requirement::parse(trimmed, idx + 1)?);
    }
    Ok(requirements)
}

/// The reproducibility invariant: every exact pin in the manifest must appear
/// in the lock file at the same version. A missing lock is accepted (versions
/// may float within manifest constraints) but is worth a loud note.
pub fn check_agreement(
    manifest: &DependencyManifest,
    lock: Option<&LockFile>,
) -> Result<(), ResolutionError> {
    let lock = match lock {
        Some(lock) => lock,
        None => {
            warn!("no lock file present; dependency resolution may float between builds");
            return Ok(());
        }
    };

    for requirement in &manifest.requirements {
        let pinned = match lock.find(&requirement.name) {
            Some(pinned) => pinned,
            None => {
                return Err(ResolutionError::MissingFromLock {
                    package: requirement.name.clone(),
                })
            }
        };

        if let (Some(manifest_version), Some(lock_version)) =
            (&requirement.version, &pinned.version)
        {
            if manifest_version != lock_version {
                return Err(ResolutionError::LockDisagreement {
                    package: requirement.name.clone(),
                    manifest_version: manifest_version.clone(),
                    lock_version: lock_version.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Cache key for the dependency-install layer: a digest over the manifest,
/// the lock file, and the variant mechanism. Application source never feeds
/// this key, which is what keeps the install layer a cache hit across code
/// changes.
pub fn install_cache_key(
    manifest: &DependencyManifest,
    lock: Option<&LockFile>,
    mechanism: &VariantMechanism,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(manifest.raw().as_bytes());
    hasher.update([0x1f]);
    if let Some(lock) = lock {
        hasher.update(lock.raw().as_bytes());
    }
    hasher.update([0x1f]);
    hasher.update(mechanism.fingerprint().as_bytes());
    hex::encode(hasher.finalize())
}
