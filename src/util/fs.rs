//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Extensions of files carried into installs and packages: shared
/// libraries, addon binaries and debug symbols.
pub const ARTIFACT_EXTENSIONS: &[&str] = &["dll", "so", "dylib", "node", "pdb"];

/// Directory extension of macOS framework bundles, carried whole.
pub const BUNDLE_EXTENSION: &str = "framework";

/// A file selected for install or packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    /// Where the file is now
    pub source: PathBuf,
    /// Path relative to the scanned root
    pub relative: PathBuf,
    /// Path under an install directory: the bare file name, or the
    /// bundle-relative path for files inside a framework
    pub install_path: PathBuf,
    /// Symlink inside a framework bundle, recreated rather than copied
    pub symlink: bool,
}

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else if ty.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Recreate the symlink at `src` as `dst`, replacing whatever `dst` holds.
#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target =
        fs::read_link(src).with_context(|| format!("failed to read link: {}", src.display()))?;
    remove_existing(dst)?;
    std::os::unix::fs::symlink(&target, dst).with_context(|| {
        format!("failed to link {} -> {}", dst.display(), target.display())
    })
}

/// Copy what the symlink at `src` points to; dangling links are skipped.
#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    remove_existing(dst)?;
    if src.is_dir() {
        copy_dir_all(src, dst)
    } else if src.is_file() {
        fs::copy(src, dst)
            .map(|_| ())
            .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))
    } else {
        tracing::debug!("skipping dangling link {}", src.display());
        Ok(())
    }
}

fn remove_existing(path: &Path) -> Result<()> {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.with_context(|| format!("failed to remove {}", path.display()))
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
        return Ok(true);
    }
    Ok(false)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Whether `path` is a directory with at least one entry.
pub fn is_populated_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Whether a file name denotes a shared library, addon or debug symbol file.
///
/// Versioned shared objects (`libfoo.so.1`) count as shared libraries.
pub fn is_artifact_file(path: &Path) -> bool {
    if ARTIFACT_EXTENSIONS.iter().any(|ext| has_extension(path, ext)) {
        return true;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(".so."))
}

/// Collect artifact files under `root`, in a stable order.
///
/// Framework bundles are taken whole; other files are filtered by
/// [`is_artifact_file`].
pub fn collect_artifact_files(root: &Path) -> Result<Vec<ArtifactFile>> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }

    let mut walker = WalkDir::new(root).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry =
            entry.with_context(|| format!("failed to walk directory: {}", root.display()))?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            if entry.depth() > 0 && has_extension(path, BUNDLE_EXTENSION) {
                walker.skip_current_dir();
                collect_bundle(root, path, &mut files)?;
            }
            continue;
        }

        if is_artifact_file(path) {
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            let install_path = PathBuf::from(entry.file_name());
            files.push(ArtifactFile {
                source: path.to_path_buf(),
                relative,
                install_path,
                symlink: false,
            });
        }
    }

    Ok(files)
}

fn collect_bundle(root: &Path, bundle: &Path, files: &mut Vec<ArtifactFile>) -> Result<()> {
    let bundle_parent = bundle.parent().unwrap_or(root);

    for entry in WalkDir::new(bundle).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("failed to walk bundle: {}", bundle.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        files.push(ArtifactFile {
            source: path.to_path_buf(),
            relative: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
            install_path: path.strip_prefix(bundle_parent).unwrap_or(path).to_path_buf(),
            symlink: entry.path_is_symlink(),
        });
    }
    Ok(())
}

/// Copy artifact files into `dest`, overwriting files of the same name.
///
/// Returns the destination paths in copy order. Files already at their
/// destination are left in place.
pub fn copy_artifacts(files: &[ArtifactFile], dest: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dest)?;

    let mut copied = Vec::with_capacity(files.len());
    for file in files {
        let target = dest.join(&file.install_path);

        if target != file.source {
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            if file.symlink {
                copy_symlink(&file.source, &target)?;
            } else {
                fs::copy(&file.source, &target).with_context(|| {
                    format!(
                        "failed to copy {} to {}",
                        file.source.display(),
                        target.display()
                    )
                })?;
            }
            tracing::debug!("copied {} -> {}", file.source.display(), target.display());
        }

        copied.push(target);
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
    }

    #[test]
    fn test_collect_artifact_files_filters_extensions() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("addon.node"));
        touch(&root.join("lib/libsdk.so.1"));
        touch(&root.join("bin/sdk.dll"));
        touch(&root.join("bin/sdk.pdb"));
        touch(&root.join("obj/addon.o"));
        touch(&root.join("include/sdk.h"));

        let files = collect_artifact_files(root).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.install_path.to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["addon.node", "sdk.dll", "sdk.pdb", "libsdk.so.1"]);
    }

    #[test]
    fn test_collect_keeps_framework_layout() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("out/Sdk.framework/Versions/A/Sdk"));
        touch(&root.join("out/Sdk.framework/Resources/Info.plist"));

        let files = collect_artifact_files(root).unwrap();
        let installs: Vec<_> = files.iter().map(|f| f.install_path.clone()).collect();

        assert!(installs.contains(&PathBuf::from("Sdk.framework/Versions/A/Sdk")));
        assert!(installs.contains(&PathBuf::from("Sdk.framework/Resources/Info.plist")));
        assert_eq!(files.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_framework_symlinks_are_recreated() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let bundle = src.join("Sdk.framework");
        touch(&bundle.join("Versions/A/Sdk"));
        touch(&bundle.join("Versions/A/Headers/sdk.h"));
        symlink("A", bundle.join("Versions/Current")).unwrap();
        symlink("Versions/Current/Sdk", bundle.join("Sdk")).unwrap();
        symlink("Versions/Current/Headers", bundle.join("Headers")).unwrap();

        let files = collect_artifact_files(&src).unwrap();
        assert_eq!(files.iter().filter(|f| f.symlink).count(), 3);

        copy_artifacts(&files, &dst).unwrap();
        // a second install replaces the links in place
        copy_artifacts(&files, &dst).unwrap();

        let copied = dst.join("Sdk.framework");
        assert_eq!(
            fs::read_link(copied.join("Versions/Current")).unwrap(),
            PathBuf::from("A")
        );
        assert!(fs::symlink_metadata(copied.join("Headers"))
            .unwrap()
            .file_type()
            .is_symlink());
        assert_eq!(
            fs::read(copied.join("Sdk")).unwrap(),
            fs::read(bundle.join("Versions/A/Sdk")).unwrap()
        );
        assert!(copied.join("Headers/sdk.h").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_all_keeps_symlinks() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("Versions/A/Sdk"));
        std::os::unix::fs::symlink("A", src.join("Versions/Current")).unwrap();

        let dst = tmp.path().join("dst");
        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(
            fs::read_link(dst.join("Versions/Current")).unwrap(),
            PathBuf::from("A")
        );
    }

    #[test]
    fn test_copy_artifacts_overwrites() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        touch(&src.join("nested/addon.node"));
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("addon.node"), "stale").unwrap();

        let files = collect_artifact_files(&src).unwrap();
        let copied = copy_artifacts(&files, &dst).unwrap();

        assert_eq!(copied, vec![dst.join("addon.node")]);
        assert_ne!(fs::read_to_string(dst.join("addon.node")).unwrap(), "stale");
    }

    #[test]
    fn test_copy_artifacts_in_place() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("addon.node"));

        let files = collect_artifact_files(tmp.path()).unwrap();
        let copied = copy_artifacts(&files, tmp.path()).unwrap();

        assert_eq!(copied, vec![tmp.path().join("addon.node")]);
    }

    #[test]
    fn test_is_populated_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_populated_dir(&tmp.path().join("missing")));
        assert!(!is_populated_dir(tmp.path()));
        touch(&tmp.path().join("x"));
        assert!(is_populated_dir(tmp.path()));
    }

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        fs::create_dir_all(src.join("include")).unwrap();
        fs::write(src.join("include/sdk.h"), "content").unwrap();

        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("include/sdk.h")).unwrap(), "content");
    }
}
