//! Error kinds surfaced by provisioning operations.

use std::path::PathBuf;

use serde_json::json;
use thiserror::Error;

use crate::builder::fallback::BuildStep;
use crate::core::artifact_key::ArtifactClass;

/// Error from resolving, installing, building or packaging artifacts.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to fetch artifact catalog from {url}: {reason}")]
    CatalogFetch { url: String, reason: String },

    #[error("no prebuilt {class} named `{name}` matches {host}")]
    NoMatchingArtifact {
        class: ArtifactClass,
        name: String,
        host: String,
    },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("failed to extract {}: {reason}", archive.display())]
    Extraction { archive: PathBuf, reason: String },

    #[error("{toolchain} build failed while {step}: {reason}")]
    BuildToolchain {
        toolchain: String,
        step: BuildStep,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("filesystem error at {}: {reason}", path.display())]
    Filesystem { path: PathBuf, reason: String },
}

impl ProvisionError {
    /// Stable identifier for machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionError::CatalogFetch { .. } => "CatalogFetchError",
            ProvisionError::NoMatchingArtifact { .. } => "NoMatchingArtifact",
            ProvisionError::Download { .. } => "DownloadError",
            ProvisionError::Extraction { .. } => "ExtractionError",
            ProvisionError::BuildToolchain { .. } => "BuildToolchainError",
            ProvisionError::Configuration(_) => "ConfigurationError",
            ProvisionError::Filesystem { .. } => "FilesystemError",
        }
    }

    /// Whether a local build may stand in for the failed addon install.
    pub fn is_recoverable_by_fallback(&self) -> bool {
        matches!(
            self,
            ProvisionError::NoMatchingArtifact { .. }
                | ProvisionError::Download { .. }
                | ProvisionError::Extraction { .. }
        )
    }

    /// Wrap a helper error that touched `path`.
    pub fn filesystem(path: impl Into<PathBuf>, err: impl Into<anyhow::Error>) -> Self {
        ProvisionError::Filesystem {
            path: path.into(),
            reason: format!("{:#}", err.into()),
        }
    }

    /// Render as `{"error": {"kind": ..., "message": ...}}`.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}
