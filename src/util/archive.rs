//! Gzipped tarball extraction and creation.

use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder, EntryType};

use crate::util::fs::ensure_dir;

/// Extract a `.tar.gz` into `dest`, dropping the first `strip` path components.
///
/// Entries with too few components are skipped. Entries that would escape
/// `dest` abort the extraction: absolute paths, `..` components, symlinks
/// whose target is absolute or climbs with `..`, and writes whose parent
/// directory resolves outside `dest`.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path, strip: usize) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive: {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));

    ensure_dir(dest)?;
    let root = dest
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", dest.display()))?;

    let mut extracted = Vec::new();
    for entry in archive.entries().context("failed to read archive entries")? {
        let mut entry = entry.context("failed to read archive entry")?;
        let entry_path = entry.path().context("invalid entry path")?.into_owned();

        let Some(relative) = strip_components(&entry_path, strip)? else {
            continue;
        };
        let output_path = dest.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                prepare_parent(&root, &output_path)?;
                std::fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            EntryType::Regular | EntryType::Continuous | EntryType::Symlink => {
                if entry.header().entry_type() == EntryType::Symlink {
                    let target = entry
                        .link_name()
                        .context("invalid link target")?
                        .with_context(|| format!("symlink {} has no target", entry_path.display()))?;
                    check_link_target(&entry_path, &target)?;
                }
                prepare_parent(&root, &output_path)?;
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to unpack {}", entry_path.display())
                })?;
                extracted.push(output_path);
            }
            EntryType::Link => {
                let target = entry
                    .link_name()
                    .context("invalid link target")?
                    .with_context(|| format!("hard link {} has no target", entry_path.display()))?
                    .into_owned();
                let Some(target_relative) = strip_components(&target, strip)? else {
                    bail!("hard link {} points outside the archive", entry_path.display());
                };
                let source = dest.join(target_relative);
                ensure_inside(&root, &source)?;
                prepare_parent(&root, &output_path)?;
                std::fs::hard_link(&source, &output_path).with_context(|| {
                    format!("failed to link {} to {}", output_path.display(), source.display())
                })?;
                extracted.push(output_path);
            }
            other => {
                tracing::debug!("skipping {:?} entry {}", other, entry_path.display());
            }
        }
    }

    Ok(extracted)
}

fn check_link_target(entry_path: &Path, target: &Path) -> Result<()> {
    let escapes = target
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        bail!(
            "archive symlink {} -> {} escapes destination",
            entry_path.display(),
            target.display()
        );
    }
    Ok(())
}

fn prepare_parent(root: &Path, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        ensure_dir(parent)?;
        ensure_inside(root, parent)?;
    }
    Ok(())
}

fn ensure_inside(root: &Path, path: &Path) -> Result<()> {
    let resolved = path
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", path.display()))?;
    if !resolved.starts_with(root) {
        bail!("archive entry escapes destination: {}", path.display());
    }
    Ok(())
}

/// Drop the first `strip` components of an archive entry path.
///
/// Returns `None` when nothing is left after stripping.
pub fn strip_components(path: &Path, strip: usize) -> Result<Option<PathBuf>> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            _ => bail!("archive entry escapes destination: {}", path.display()),
        }
    }

    if parts.len() <= strip {
        return Ok(None);
    }
    Ok(Some(parts[strip..].iter().collect()))
}

/// Write a `.tar.gz` at `output` from `(source file, name in archive)` pairs.
pub fn create_tar_gz(output: &Path, entries: &[(PathBuf, PathBuf)]) -> Result<()> {
    if let Some(parent) = output.parent() {
        ensure_dir(parent)?;
    }

    let file = File::create(output)
        .with_context(|| format!("failed to create archive: {}", output.display()))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    for (source, name) in entries {
        builder
            .append_path_with_name(source, name)
            .with_context(|| format!("failed to add {} to archive", source.display()))?;
    }

    let encoder = builder
        .into_inner()
        .with_context(|| format!("failed to finish archive: {}", output.display()))?;
    encoder
        .finish()
        .with_context(|| format!("failed to flush archive: {}", output.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tar_gz_entries, TarEntry};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_strip_components() {
        let stripped = strip_components(Path::new("pkg/lib/addon.node"), 1).unwrap();
        assert_eq!(stripped, Some(PathBuf::from("lib/addon.node")));

        assert_eq!(strip_components(Path::new("pkg"), 1).unwrap(), None);
        assert_eq!(strip_components(Path::new("./pkg/a.dll"), 1).unwrap(), Some(PathBuf::from("a.dll")));
    }

    #[test]
    fn test_strip_components_rejects_parent_dirs() {
        assert!(strip_components(Path::new("pkg/../../etc/passwd"), 1).is_err());
    }

    #[test]
    fn test_create_then_extract_strips_top_level() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("addon.node");
        fs::write(&src, "binary").unwrap();

        let archive = tmp.path().join("out/pkg.tar.gz");
        create_tar_gz(&archive, &[(src, PathBuf::from("pkg/addon.node"))]).unwrap();

        let dest = tmp.path().join("extracted");
        let files = extract_tar_gz(&archive, &dest, 1).unwrap();

        assert_eq!(files, vec![dest.join("addon.node")]);
        assert_eq!(fs::read_to_string(dest.join("addon.node")).unwrap(), "binary");
    }

    #[test]
    fn test_extract_rejects_absolute_symlink() {
        let tmp = TempDir::new().unwrap();
        let outside = tmp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        let outside_str = outside.to_string_lossy().into_owned();

        let archive = tmp.path().join("evil.tar.gz");
        fs::write(
            &archive,
            tar_gz_entries(&[
                TarEntry::Symlink("top/evil", &outside_str),
                TarEntry::File("top/evil/pwned.so", b"owned"),
            ]),
        )
        .unwrap();

        assert!(extract_tar_gz(&archive, &tmp.path().join("out"), 1).is_err());
        assert!(!outside.join("pwned.so").exists());
    }

    #[test]
    fn test_extract_rejects_climbing_symlink() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("evil.tar.gz");
        fs::write(
            &archive,
            tar_gz_entries(&[
                TarEntry::Symlink("top/up", "../.."),
                TarEntry::File("top/up/pwned.so", b"owned"),
            ]),
        )
        .unwrap();

        assert!(extract_tar_gz(&archive, &tmp.path().join("a/out"), 1).is_err());
        assert!(!tmp.path().join("pwned.so").exists());
        assert!(!tmp.path().join("a/pwned.so").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_keeps_framework_symlinks() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("sdk.tar.gz");
        fs::write(
            &archive,
            tar_gz_entries(&[
                TarEntry::File("top/Sdk.framework/Versions/A/Sdk", b"dylib"),
                TarEntry::Symlink("top/Sdk.framework/Versions/Current", "A"),
                TarEntry::Symlink("top/Sdk.framework/Sdk", "Versions/Current/Sdk"),
            ]),
        )
        .unwrap();

        let dest = tmp.path().join("out");
        extract_tar_gz(&archive, &dest, 1).unwrap();

        let current = dest.join("Sdk.framework/Versions/Current");
        assert_eq!(fs::read_link(&current).unwrap(), PathBuf::from("A"));
        assert_eq!(fs::read(dest.join("Sdk.framework/Sdk")).unwrap(), b"dylib");
    }

    #[test]
    fn test_extract_rejects_corrupt_archive() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("broken.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        assert!(extract_tar_gz(&archive, &tmp.path().join("out"), 1).is_err());
    }
}
