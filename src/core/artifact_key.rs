//! Archive naming shared by the packager and the matcher.
//!
//! Published archives are named
//! `<name>-v<version>[-abi<tag>]-<platform>-<arch>.tar.gz`. The packager
//! produces names with [`ArtifactKey::file_name`] and the matcher reads them
//! back with [`ArtifactKey::decode`], comparing whole fields rather than
//! searching for substrings (so `x64` never matches `arm64`).

use std::fmt;

use crate::core::abi::AbiTag;
use crate::core::host::{Arch, Platform};

/// Extension of every archive the packager writes.
pub const ARCHIVE_EXT: &str = ".tar.gz";

/// Extensions recognized when reading archive names.
const ARCHIVE_EXTS: &[&str] = &[".tar.gz", ".tgz"];

/// The two kinds of published artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactClass {
    /// Platform support libraries; independent of the runtime ABI.
    Sdk,
    /// The compiled addon; tied to one runtime ABI.
    Addon,
}

impl ArtifactClass {
    /// Whether entries of this class must carry a matching ABI tag.
    pub fn is_abi_sensitive(&self) -> bool {
        matches!(self, ArtifactClass::Addon)
    }
}

impl fmt::Display for ArtifactClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactClass::Sdk => f.write_str("sdk"),
            ArtifactClass::Addon => f.write_str("addon"),
        }
    }
}

/// The structured fields of an archive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKey {
    /// Logical artifact name; may itself contain hyphens
    pub name: String,
    /// Package version, without the `v` prefix
    pub version: String,
    /// ABI tag digits, without the `abi` prefix
    pub abi: Option<String>,
    /// Platform token
    pub platform: String,
    /// Architecture token
    pub arch: String,
}

impl ArtifactKey {
    /// Key for an addon archive.
    pub fn for_addon(
        name: &str,
        version: &str,
        abi: AbiTag,
        platform: Platform,
        arch: Arch,
    ) -> Self {
        ArtifactKey {
            name: name.to_string(),
            version: version.to_string(),
            abi: Some(abi.to_string()),
            platform: platform.as_str().to_string(),
            arch: arch.as_str().to_string(),
        }
    }

    /// Key for an SDK archive (no ABI field).
    pub fn for_sdk(name: &str, version: &str, platform: Platform, arch: Arch) -> Self {
        ArtifactKey {
            name: name.to_string(),
            version: version.to_string(),
            abi: None,
            platform: platform.as_str().to_string(),
            arch: arch.as_str().to_string(),
        }
    }

    /// Encode the key without an archive extension.
    pub fn encode(&self) -> String {
        match &self.abi {
            Some(abi) => format!(
                "{}-v{}-abi{}-{}-{}",
                self.name, self.version, abi, self.platform, self.arch
            ),
            None => format!(
                "{}-v{}-{}-{}",
                self.name, self.version, self.platform, self.arch
            ),
        }
    }

    /// Encode the key as an archive file name.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.encode(), ARCHIVE_EXT)
    }

    /// Decode an archive file name.
    ///
    /// Fields are read from the right: architecture, platform, optional
    /// `abi<digits>`, then the rightmost `v<digit>...` segment starts the
    /// version. Everything before it is the name. Returns `None` when a
    /// required field is missing or empty.
    pub fn decode(file_name: &str) -> Option<Self> {
        let stem = strip_archive_ext(file_name);
        let mut segments: Vec<&str> = stem.split('-').collect();
        if segments.len() < 4 {
            return None;
        }

        let arch = segments.pop()?;
        let platform = segments.pop()?;

        let abi = match segments.last() {
            Some(last) if is_abi_segment(last) => {
                let abi = last["abi".len()..].to_string();
                segments.pop();
                Some(abi)
            }
            _ => None,
        };

        let version_start = segments
            .iter()
            .rposition(|s| is_version_segment(s))
            .filter(|&i| i > 0)?;

        let name = segments[..version_start].join("-");
        let version = segments[version_start..].join("-")[1..].to_string();

        if name.is_empty() || platform.is_empty() || arch.is_empty() {
            return None;
        }

        Some(ArtifactKey {
            name,
            version,
            abi,
            platform: platform.to_string(),
            arch: arch.to_string(),
        })
    }

    /// Platform field, if it names a known platform.
    pub fn platform(&self) -> Option<Platform> {
        Platform::from_os(&self.platform)
    }

    /// Architecture field, if it names a known architecture.
    pub fn arch(&self) -> Option<Arch> {
        self.arch.parse().ok()
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Strip a recognized archive extension, if present.
pub fn strip_archive_ext(file_name: &str) -> &str {
    ARCHIVE_EXTS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name)
}

/// Whether a file name carries a recognized archive extension.
pub fn is_archive_name(file_name: &str) -> bool {
    ARCHIVE_EXTS.iter().any(|ext| file_name.ends_with(ext))
}

fn is_abi_segment(segment: &str) -> bool {
    segment
        .strip_prefix("abi")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn is_version_segment(segment: &str) -> bool {
    let mut bytes = segment.bytes();
    bytes.next() == Some(b'v') && bytes.next().is_some_and(|b| b.is_ascii_digit())
}
