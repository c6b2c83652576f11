//! CPU-only verification of the installed ML runtime.
//!
//! The Builder stage runs a short interpreter snippet after install that
//! prints the runtime's version and whether an accelerator backend is
//! available. For this pipeline the expected answer is always "unavailable";
//! anything else is manifest drift.

use crate::error::VariantError;
use tracing::warn;

/// Command run inside the Builder stage to report version and accelerator
/// availability.
pub fn report_command(package: &str) -> String {
    format!(
        "python -c \"import {pkg}; print({pkg}.__version__); print({pkg}.cuda.is_available())\"",
        pkg = package
    )
}

/// Build-breaking assertion appended in strict mode: the layer fails when an
/// accelerator backend is present.
pub fn assert_cpu_only_command(package: &str) -> String {
    format!(
        "python -c \"import {pkg}, sys; sys.exit(1 if {pkg}.cuda.is_available() else 0)\"",
        pkg = package
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub package: String,
    pub version: String,
    pub accelerator_available: bool,
}

impl VerifyReport {
    /// Parses the two-line output of `report_command`.
    pub fn parse(package: &str, output: &str) -> Result<Self, VariantError> {
        let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());

        let version = lines
            .next()
            .ok_or_else(|| VariantError::UnparseableReport(output.to_string()))?;
        let accelerator = match lines.next() {
            Some("True") => true,
            Some("False") => false,
            _ => return Err(VariantError::UnparseableReport(output.to_string())),
        };

        Ok(Self {
            package: package.to_string(),
            version: version.to_string(),
            accelerator_available: accelerator,
        })
    }

    /// Enforces the CPU-only constraint: fatal in strict mode, a loud
    /// warning otherwise.
    pub fn enforce(&self, strict: bool) -> Result<(), VariantError> {
        if !self.accelerator_available {
            return Ok(());
        }

        if strict {
            Err(VariantError::AcceleratorPresent {
                package: self.package.clone(),
                version: self.version.clone(),
            })
        } else {
            warn!(
                package = %self.package,
                version = %self.version,
                "accelerator backend present in a CPU-only build; manifest has likely drifted"
            );
            Ok(())
        }
    }
}
