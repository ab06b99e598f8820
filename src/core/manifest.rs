//! `package.json` manifest parsing.
//!
//! Only the fields this tool reads are modeled: the package name and version,
//! the dependency tables (to spot an electron or nw dependency), and the
//! `node_pre_build` section holding per-module settings.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// File name of the module manifest.
pub const MANIFEST_NAME: &str = "package.json";

/// The module's `package.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Package name; the default logical artifact name
    pub name: String,

    /// Package version; selects the catalog version bucket
    pub version: String,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Tool settings
    #[serde(default, rename = "node_pre_build")]
    pub prebuild: PrebuildConfig,
}

impl Manifest {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    /// Parse manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(content).context("invalid package.json")?;

        if manifest.name.trim().is_empty() {
            anyhow::bail!("package.json has an empty `name`");
        }
        if manifest.version.trim().is_empty() {
            anyhow::bail!("package.json has an empty `version`");
        }

        Ok(manifest)
    }

    /// Version requirement for a dependency, looking in `dependencies` first.
    pub fn dependency_requirement(&self, name: &str) -> Option<&str> {
        self.dependencies
            .get(name)
            .or_else(|| self.dev_dependencies.get(name))
            .map(String::as_str)
    }
}

/// The `node_pre_build` section of `package.json`.
///
/// Every field is optional; command-line flags override these and built-in
/// defaults fill the gaps (see [`crate::util::config`]).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PrebuildConfig {
    /// Name shared by the addon and the SDK
    pub name: Option<String>,

    /// Addon name, when it differs from the SDK's
    pub name_addon: Option<String>,

    /// SDK name, when it differs from the addon's
    pub name_sdk: Option<String>,

    /// SDK install directory, relative to the module root
    pub sdk_dir: Option<String>,

    /// Directory the addon is built into and loaded from
    pub binary_dir: Option<String>,

    /// Directory packed archives are written to
    pub package_dir: Option<String>,

    /// `cmake-js` or `node-gyp`
    pub build_tool: Option<String>,

    /// Architecture(s): install uses the first, build uses all
    pub arch: Option<StringOrList>,

    /// Runtime(s) to build for
    pub runtime: Option<StringOrList>,

    /// Runtime version(s) to build for
    pub runtime_version: Option<StringOrList>,

    /// Catalog endpoint
    pub catalog_url: Option<String>,

    /// Top-level catalog key holding SDK entries
    pub catalog_sdk_key: Option<String>,

    /// Top-level catalog key holding addon entries
    pub catalog_addon_key: Option<String>,

    /// HTTP timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Toolchain process timeout in seconds
    pub build_timeout_secs: Option<u64>,
}

/// A setting written either as a single string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// All values, in order.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s.clone()],
            StringOrList::Many(v) => v.clone(),
        }
    }

    /// The first value.
    pub fn first(&self) -> Option<&str> {
        match self {
            StringOrList::One(s) => Some(s.as_str()),
            StringOrList::Many(v) => v.first().map(String::as_str),
        }
    }
}
