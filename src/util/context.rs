//! Project context: the module root, its manifest and the directories
//! this tool reads and writes.
//!
//! ```text
//! <module root>/
//! ├── package.json      # manifest, `node_pre_build` section
//! ├── sdk/              # installed SDK payload (sdk-dir)
//! ├── build/Release/    # addon + shared libraries (binary-dir)
//! ├── packages/         # packed archives (package-dir)
//! └── temporary/        # download staging, safe to delete
//! ```

use std::path::{Path, PathBuf};

use crate::core::errors::ProvisionError;
use crate::core::manifest::{Manifest, MANIFEST_NAME};
use crate::util::config::{DEFAULT_BINARY_DIR, DEFAULT_SDK_DIR};

/// Name of the download staging directory.
pub const STAGING_DIR_NAME: &str = "temporary";

/// The module being provisioned.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    root: PathBuf,
    manifest: Option<Manifest>,
}

impl ProjectContext {
    /// Context for the current working directory.
    pub fn new() -> Result<Self, ProvisionError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ProvisionError::filesystem(".", e))?;
        Self::from_dir(&cwd)
    }

    /// Context for a module root.
    ///
    /// A missing `package.json` is tolerated so `clean` works anywhere; a
    /// present but unreadable one is a configuration error.
    pub fn from_dir(root: &Path) -> Result<Self, ProvisionError> {
        let manifest_path = root.join(MANIFEST_NAME);
        let manifest = if manifest_path.exists() {
            let manifest = Manifest::load(&manifest_path)
                .map_err(|e| ProvisionError::Configuration(format!("{:#}", e)))?;
            Some(manifest)
        } else {
            None
        };

        Ok(ProjectContext {
            root: root.to_path_buf(),
            manifest,
        })
    }

    /// The module root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The manifest, required by every operation except `clean`.
    pub fn manifest(&self) -> Result<&Manifest, ProvisionError> {
        self.manifest.as_ref().ok_or_else(|| {
            ProvisionError::Configuration(format!(
                "no {} found in {}",
                MANIFEST_NAME,
                self.root.display()
            ))
        })
    }

    /// The manifest, if one was found.
    pub fn manifest_opt(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Resolve a path relative to the module root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// SDK install directory.
    pub fn sdk_dir(&self) -> PathBuf {
        let configured = self
            .manifest
            .as_ref()
            .and_then(|m| m.prebuild.sdk_dir.as_deref())
            .unwrap_or(DEFAULT_SDK_DIR);
        self.root.join(configured)
    }

    /// Directory addons and shared libraries are installed into.
    pub fn binary_dir(&self) -> PathBuf {
        let configured = self
            .manifest
            .as_ref()
            .and_then(|m| m.prebuild.binary_dir.as_deref())
            .unwrap_or(DEFAULT_BINARY_DIR);
        self.root.join(configured)
    }

    /// Download staging directory.
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR_NAME)
    }
}
