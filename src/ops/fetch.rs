//! Download, stage and install published archives.
//!
//! Archives are downloaded into the staging directory, extracted one level
//! deep into `<staging>/<archive stem>/`, and their shared libraries,
//! addon binaries and debug symbols copied into the destination.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::artifact_key::{is_archive_name, strip_archive_ext, ArtifactClass};
use crate::core::errors::ProvisionError;
use crate::core::host::HostDescriptor;
use crate::sources::catalog::CatalogEntry;
use crate::sources::http::Transport;
use crate::util::archive::extract_tar_gz;
use crate::util::fs::{collect_artifact_files, copy_artifacts, copy_dir_all, ensure_dir};

/// How an installed artifact was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Downloaded,
    Built,
}

/// Outcome of installing one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub success: bool,
    pub source_kind: SourceKind,
    /// Installed files, in copy order
    pub local_paths: Vec<PathBuf>,
}

/// Installs catalog entries through a transport.
pub struct Installer<'a> {
    transport: &'a dyn Transport,
    staging_dir: PathBuf,
}

impl<'a> Installer<'a> {
    pub fn new(transport: &'a dyn Transport, staging_dir: &Path) -> Self {
        Installer {
            transport,
            staging_dir: staging_dir.to_path_buf(),
        }
    }

    /// Download `entry` and extract it, returning the staged tree.
    pub fn stage(&self, entry: &CatalogEntry) -> Result<PathBuf, ProvisionError> {
        let file_name = Path::new(&entry.filename)
            .file_name()
            .ok_or_else(|| ProvisionError::Download {
                url: entry.download_url.clone(),
                reason: format!("invalid archive name `{}`", entry.filename),
            })?;
        let archive_path = self.staging_dir.join(file_name);

        tracing::info!("Downloading {}", entry.download_url);
        let body = self
            .transport
            .get(&entry.download_url)
            .map_err(|e| ProvisionError::Download {
                url: entry.download_url.clone(),
                reason: format!("{:#}", e),
            })?;

        let write_error = |reason: String| ProvisionError::Download {
            url: entry.download_url.clone(),
            reason,
        };
        ensure_dir(&self.staging_dir).map_err(|e| write_error(format!("{:#}", e)))?;
        fs::write(&archive_path, &body).map_err(|e| {
            write_error(format!("failed to write {}: {}", archive_path.display(), e))
        })?;
        tracing::debug!("saved {} bytes to {}", body.len(), archive_path.display());

        let stem = strip_archive_ext(&file_name.to_string_lossy()).to_string();
        let staged = self.staging_dir.join(stem);
        if staged.exists() {
            fs::remove_dir_all(&staged).map_err(|e| ProvisionError::filesystem(&staged, e))?;
        }

        extract_tar_gz(&archive_path, &staged, 1).map_err(|e| ProvisionError::Extraction {
            archive: archive_path.clone(),
            reason: format!("{:#}", e),
        })?;

        Ok(staged)
    }

    /// Install an archive's binaries into `dest`.
    pub fn install(
        &self,
        entry: &CatalogEntry,
        dest: &Path,
    ) -> Result<InstallResult, ProvisionError> {
        let staged = self.stage(entry)?;
        let local_paths = copy_shared_libraries(&staged, dest)?;

        if local_paths.is_empty() {
            return Err(ProvisionError::Extraction {
                archive: self.staging_dir.join(&entry.filename),
                reason: format!("no binaries under a top-level directory in {}", staged.display()),
            });
        }
        tracing::info!("Installed {} file(s) into {}", local_paths.len(), dest.display());

        Ok(InstallResult {
            success: true,
            source_kind: SourceKind::Downloaded,
            local_paths,
        })
    }

    /// Install an SDK archive into `sdk_dir`, then its libraries into `binary_dir`.
    ///
    /// An SDK archive either holds per-platform payload archives, one of
    /// which is selected by the host's SDK tokens, or is the payload itself.
    pub fn install_sdk(
        &self,
        entry: &CatalogEntry,
        host: &HostDescriptor,
        sdk_dir: &Path,
        binary_dir: &Path,
    ) -> Result<InstallResult, ProvisionError> {
        let staged = self.stage(entry)?;
        let payloads = nested_archives(&staged)?;

        if payloads.is_empty() {
            tracing::debug!("no nested payloads in {}, copying staged tree", staged.display());
            copy_dir_all(&staged, sdk_dir).map_err(|e| ProvisionError::filesystem(sdk_dir, e))?;
        } else {
            let platform = host.platform.sdk_token();
            let arch = host.arch.sdk_token();
            let payload = payloads
                .iter()
                .find(|path| has_tokens(path, platform, arch))
                .ok_or_else(|| ProvisionError::NoMatchingArtifact {
                    class: ArtifactClass::Sdk,
                    name: format!("{} payload", entry.filename),
                    host: host.to_string(),
                })?;

            tracing::info!("Extracting {} into {}", payload.display(), sdk_dir.display());
            extract_tar_gz(payload, sdk_dir, 0).map_err(|e| ProvisionError::Extraction {
                archive: payload.clone(),
                reason: format!("{:#}", e),
            })?;
        }

        let local_paths = copy_shared_libraries(sdk_dir, binary_dir)?;
        tracing::info!(
            "Installed SDK into {} ({} librar{} copied to {})",
            sdk_dir.display(),
            local_paths.len(),
            if local_paths.len() == 1 { "y" } else { "ies" },
            binary_dir.display()
        );

        Ok(InstallResult {
            success: true,
            source_kind: SourceKind::Downloaded,
            local_paths,
        })
    }
}

/// Copy every shared library, addon and symbol file under `src` into `dest`.
pub fn copy_shared_libraries(src: &Path, dest: &Path) -> Result<Vec<PathBuf>, ProvisionError> {
    let files = collect_artifact_files(src).map_err(|e| ProvisionError::filesystem(src, e))?;
    copy_artifacts(&files, dest).map_err(|e| ProvisionError::filesystem(dest, e))
}

fn nested_archives(root: &Path) -> Result<Vec<PathBuf>, ProvisionError> {
    let mut archives = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ProvisionError::filesystem(root, e))?;
        if entry.file_type().is_file() && is_archive_name(&entry.file_name().to_string_lossy()) {
            archives.push(entry.into_path());
        }
    }
    Ok(archives)
}

fn has_tokens(path: &Path, platform: &str, arch: &str) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    let tokens: Vec<&str> = strip_archive_ext(&name)
        .split(['-', '_', '.'])
        .collect();
    tokens.contains(&platform) && tokens.contains(&arch)
}
