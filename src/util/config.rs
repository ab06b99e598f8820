//! Option resolution.
//!
//! Every setting comes from up to three layers:
//! 1. Command-line flags
//! 2. The `node_pre_build` section of `package.json`
//! 3. Built-in defaults
//!
//! Resolution is a pure function of those layers so it can be tested
//! without touching the filesystem.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::builder::toolchain::ToolchainKind;
use crate::core::errors::ProvisionError;
use crate::core::host::{Arch, RuntimeFamily};
use crate::core::manifest::PrebuildConfig;
use crate::sources::catalog::{CatalogKeys, DEFAULT_CATALOG_URL};

/// Default directory the SDK payload is installed into.
pub const DEFAULT_SDK_DIR: &str = "sdk";

/// Default directory addons are built into and loaded from.
pub const DEFAULT_BINARY_DIR: &str = "build/Release";

/// Default directory packed archives are written to.
pub const DEFAULT_PACKAGE_DIR: &str = "packages";

/// Toolchain used when neither a flag nor the manifest names one.
pub const DEFAULT_TOOLCHAIN: ToolchainKind = ToolchainKind::NodeGyp;

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 1800;

/// Pick the first layer that is set: flag, then config, then default.
pub fn resolve_option<T>(flag: Option<T>, config: Option<T>, default: T) -> T {
    flag.or(config).unwrap_or(default)
}

/// List variant of [`resolve_option`]: an empty flag list counts as unset.
pub fn resolve_list<T>(flag: Vec<T>, config: Option<Vec<T>>, default: Vec<T>) -> Vec<T> {
    if !flag.is_empty() {
        return flag;
    }
    match config {
        Some(values) if !values.is_empty() => values,
        _ => default,
    }
}

fn parse_setting<T>(what: &str, raw: &str) -> Result<T, ProvisionError>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>()
        .map_err(|e| ProvisionError::Configuration(format!("{} ({})", e, what)))
}

fn parse_catalog_url(raw: &str) -> Result<Url, ProvisionError> {
    Url::parse(raw).map_err(|e| {
        ProvisionError::Configuration(format!("invalid catalog url `{}`: {}", raw, e))
    })
}

/// Install/reinstall flags as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct InstallFlags {
    pub name: Option<String>,
    pub name_addon: Option<String>,
    pub name_sdk: Option<String>,
    pub arch: Option<String>,
    /// `Some(None)`: fallback requested without naming a toolchain
    pub fall_back_to_build: Option<Option<String>>,
    pub catalog_url: Option<String>,
}

/// Fully resolved settings for `install`.
#[derive(Debug, Clone)]
pub struct ResolvedInstallOptions {
    pub addon_name: String,
    pub sdk_name: String,
    /// `None` means "use the host architecture"
    pub arch: Option<Arch>,
    /// `None` means fallback is not permitted
    pub fallback: Option<ToolchainKind>,
    pub catalog_url: Url,
    pub catalog_keys: CatalogKeys,
    pub timeout: Duration,
    pub build_timeout: Duration,
}

impl ResolvedInstallOptions {
    /// Merge flags over the manifest section over defaults.
    pub fn resolve(
        flags: &InstallFlags,
        config: &PrebuildConfig,
        package_name: &str,
    ) -> Result<Self, ProvisionError> {
        let addon_name = resolve_name(
            flags.name.as_ref().or(flags.name_addon.as_ref()),
            config.name.as_ref().or(config.name_addon.as_ref()),
            package_name,
        );
        let sdk_name = resolve_name(
            flags.name.as_ref().or(flags.name_sdk.as_ref()),
            config.name.as_ref().or(config.name_sdk.as_ref()),
            package_name,
        );

        let arch = flags
            .arch
            .as_deref()
            .or_else(|| config.arch.as_ref().and_then(|a| a.first()))
            .map(|raw| parse_setting::<Arch>("arch", raw))
            .transpose()?;

        let fallback = match &flags.fall_back_to_build {
            None => None,
            Some(tool) => {
                let raw = tool.as_deref().or(config.build_tool.as_deref());
                Some(match raw {
                    Some(raw) => parse_setting::<ToolchainKind>("build-tool", raw)?,
                    None => DEFAULT_TOOLCHAIN,
                })
            }
        };

        let catalog_url = parse_catalog_url(&resolve_option(
            flags.catalog_url.clone(),
            config.catalog_url.clone(),
            DEFAULT_CATALOG_URL.to_string(),
        ))?;

        let defaults = CatalogKeys::default();
        let catalog_keys = CatalogKeys {
            sdk: resolve_option(None, config.catalog_sdk_key.clone(), defaults.sdk),
            addon: resolve_option(None, config.catalog_addon_key.clone(), defaults.addon),
        };

        Ok(ResolvedInstallOptions {
            addon_name,
            sdk_name,
            arch,
            fallback,
            catalog_url,
            catalog_keys,
            timeout: Duration::from_secs(resolve_option(
                None,
                config.timeout_secs,
                DEFAULT_TIMEOUT_SECS,
            )),
            build_timeout: build_timeout(config),
        })
    }
}

fn resolve_name(flag: Option<&String>, config: Option<&String>, package_name: &str) -> String {
    resolve_option(flag.cloned(), config.cloned(), package_name.to_string())
}

fn build_timeout(config: &PrebuildConfig) -> Duration {
    Duration::from_secs(resolve_option(
        None,
        config.build_timeout_secs,
        DEFAULT_BUILD_TIMEOUT_SECS,
    ))
}

/// Build flags as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct BuildFlags {
    pub build_tool: Option<String>,
    pub binary_dir: Option<PathBuf>,
    pub package_dir: Option<PathBuf>,
    pub runtime: Vec<String>,
    pub runtime_version: Vec<String>,
    pub arch: Vec<String>,
    pub pack: bool,
}

/// Fully resolved settings for `build`.
#[derive(Debug, Clone)]
pub struct ResolvedBuildOptions {
    pub toolchain: ToolchainKind,
    pub addon_name: String,
    pub binary_dir: PathBuf,
    pub package_dir: PathBuf,
    pub runtimes: Vec<RuntimeFamily>,
    /// Empty means "the host's runtime version"
    pub runtime_versions: Vec<String>,
    /// Empty means "the host architecture"
    pub arches: Vec<Arch>,
    pub pack: bool,
    pub build_timeout: Duration,
}

impl ResolvedBuildOptions {
    /// Merge flags over the manifest section over defaults.
    pub fn resolve(
        flags: &BuildFlags,
        config: &PrebuildConfig,
        package_name: &str,
    ) -> Result<Self, ProvisionError> {
        let toolchain = match flags.build_tool.as_deref().or(config.build_tool.as_deref()) {
            Some(raw) => parse_setting::<ToolchainKind>("build-tool", raw)?,
            None => DEFAULT_TOOLCHAIN,
        };

        let addon_name = resolve_name(
            None,
            config.name.as_ref().or(config.name_addon.as_ref()),
            package_name,
        );

        let binary_dir = resolve_option(
            flags.binary_dir.clone(),
            config.binary_dir.as_ref().map(PathBuf::from),
            PathBuf::from(DEFAULT_BINARY_DIR),
        );
        let package_dir = resolve_option(
            flags.package_dir.clone(),
            config.package_dir.as_ref().map(PathBuf::from),
            PathBuf::from(DEFAULT_PACKAGE_DIR),
        );

        let runtimes = resolve_list(
            flags.runtime.clone(),
            config.runtime.as_ref().map(|r| r.to_vec()),
            vec![RuntimeFamily::Node.as_str().to_string()],
        )
        .iter()
        .map(|raw| parse_setting::<RuntimeFamily>("runtime", raw))
        .collect::<Result<Vec<_>, _>>()?;

        let runtime_versions = resolve_list(
            flags.runtime_version.clone(),
            config.runtime_version.as_ref().map(|r| r.to_vec()),
            Vec::new(),
        );

        let arches = resolve_list(
            flags.arch.clone(),
            config.arch.as_ref().map(|a| a.to_vec()),
            Vec::new(),
        )
        .iter()
        .map(|raw| parse_setting::<Arch>("arch", raw))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolvedBuildOptions {
            toolchain,
            addon_name,
            binary_dir,
            package_dir,
            runtimes,
            runtime_versions,
            arches,
            pack: flags.pack,
            build_timeout: build_timeout(config),
        })
    }
}
