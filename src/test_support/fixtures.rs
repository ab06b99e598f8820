//! Test fixtures for common test scenarios.
//!
//! Archives, catalogs and module manifests shaped like the real ones.

use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};

/// One entry of an in-memory archive.
#[derive(Debug, Clone, Copy)]
pub enum TarEntry<'a> {
    /// Regular file: path in archive, contents
    File(&'a str, &'a [u8]),
    /// Symbolic link: path in archive, link target
    Symlink(&'a str, &'a str),
}

/// Build a `.tar.gz` in memory from `(path in archive, contents)` pairs.
pub fn tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let entries: Vec<TarEntry<'_>> = entries
        .iter()
        .map(|&(path, contents)| TarEntry::File(path, contents))
        .collect();
    tar_gz_entries(&entries)
}

/// Build a `.tar.gz` in memory from files and symlinks, in order.
pub fn tar_gz_entries(entries: &[TarEntry<'_>]) -> Vec<u8> {
    let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for entry in entries {
        let mut header = Header::new_gnu();
        match *entry {
            TarEntry::File(path, contents) => {
                header.set_size(contents.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append_data(&mut header, path, contents)
                    .expect("failed to append archive entry");
            }
            TarEntry::Symlink(path, target) => {
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                builder
                    .append_link(&mut header, path, target)
                    .expect("failed to append archive link");
            }
        }
    }
    let encoder = builder.into_inner().expect("failed to finish archive");
    encoder.finish().expect("failed to finish gzip stream")
}

/// A catalog document with one SDK and one addon bucket, under the default class keys.
pub fn catalog_json(
    version_key: &str,
    sdk: &[(&str, &str)],
    addon: &[(&str, &str)],
) -> String {
    let entries = |list: &[(&str, &str)]| {
        list.iter()
            .map(|(filename, url)| serde_json::json!({ "filename": filename, "cdnlink": url }))
            .collect::<Vec<_>>()
    };
    serde_json::json!({
        "code": 200,
        "message": { version_key: entries(sdk) },
        "electron": { version_key: entries(addon) },
    })
    .to_string()
}

/// Minimal module manifest with an optional `node_pre_build` section.
pub fn module_manifest(name: &str, version: &str, prebuild: Option<&str>) -> String {
    match prebuild {
        Some(section) => format!(
            r#"{{"name": "{name}", "version": "{version}", "node_pre_build": {section}}}"#
        ),
        None => format!(r#"{{"name": "{name}", "version": "{version}"}}"#),
    }
}

/// Write a module manifest into `dir`.
pub fn write_manifest(dir: &Path, name: &str, version: &str, prebuild: Option<&str>) {
    let mut file =
        std::fs::File::create(dir.join("package.json")).expect("failed to create package.json");
    file.write_all(module_manifest(name, version, prebuild).as_bytes())
        .expect("failed to write package.json");
}
