//! Packaging of built addons for publishing.
//!
//! Archives hold the binaries under a single top-level directory named
//! after the artifact key, so installing one (which strips a level) puts
//! them straight into the destination.

use std::path::{Path, PathBuf};

use crate::core::artifact_key::ArtifactKey;
use crate::core::errors::ProvisionError;
use crate::util::archive::create_tar_gz;
use crate::util::fs::collect_artifact_files;

/// Write `<package_dir>/<key>.tar.gz` from the binaries in `binary_dir`.
pub fn pack(
    binary_dir: &Path,
    package_dir: &Path,
    key: &ArtifactKey,
) -> Result<PathBuf, ProvisionError> {
    let files = collect_artifact_files(binary_dir)
        .map_err(|e| ProvisionError::filesystem(binary_dir, e))?;
    let files: Vec<PathBuf> = files.into_iter().map(|file| file.source).collect();
    pack_files(binary_dir, &files, package_dir, key)
}

/// Write `<package_dir>/<key>.tar.gz` from `files`, which live under `binary_dir`.
///
/// Only the listed files are packed, so leftovers of other builds in
/// `binary_dir` stay out of the archive.
pub fn pack_files(
    binary_dir: &Path,
    files: &[PathBuf],
    package_dir: &Path,
    key: &ArtifactKey,
) -> Result<PathBuf, ProvisionError> {
    if files.is_empty() {
        return Err(ProvisionError::filesystem(
            binary_dir,
            anyhow::anyhow!("no addon binaries to pack"),
        ));
    }

    let top = PathBuf::from(key.encode());
    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let relative = file.strip_prefix(binary_dir).map_err(|_| {
            ProvisionError::filesystem(
                file,
                anyhow::anyhow!("not inside {}", binary_dir.display()),
            )
        })?;
        entries.push((file.clone(), top.join(relative)));
    }

    let output = package_dir.join(key.file_name());
    create_tar_gz(&output, &entries).map_err(|e| ProvisionError::filesystem(&output, e))?;

    tracing::info!("Packed {} ({} file(s))", output.display(), entries.len());
    Ok(output)
}
