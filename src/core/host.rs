//! Host identity: platform, CPU architecture and the runtime an addon loads into.

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::core::abi::{abi_tag, AbiTag};
use crate::core::errors::ProvisionError;
use crate::core::manifest::Manifest;
use crate::util::process::{find_executable, ProcessBuilder};

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Macos,
    Linux,
}

impl Platform {
    /// Map an OS name to a platform, accepting Node's `win32`/`darwin` spellings.
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "windows" | "win32" => Some(Platform::Windows),
            "macos" | "darwin" => Some(Platform::Macos),
            "linux" => Some(Platform::Linux),
            _ => None,
        }
    }

    /// Token written into archive names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Macos => "macos",
            Platform::Linux => "linux",
        }
    }

    /// Token used by nested SDK payload archives.
    pub fn sdk_token(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Macos => "macosx",
            Platform::Linux => "linux",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::from_os(s).ok_or_else(|| format!("unknown platform `{}`", s))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture, named the way Node names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Ia32,
    X64,
    Arm,
    Arm64,
}

impl Arch {
    /// Map a Rust `target_arch` name to a Node architecture.
    pub fn from_rust_arch(arch: &str) -> Option<Self> {
        match arch {
            "x86" => Some(Arch::Ia32),
            "x86_64" => Some(Arch::X64),
            "arm" => Some(Arch::Arm),
            "aarch64" => Some(Arch::Arm64),
            _ => None,
        }
    }

    /// Token written into archive names and passed to toolchains.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Ia32 => "ia32",
            Arch::X64 => "x64",
            Arch::Arm => "arm",
            Arch::Arm64 => "arm64",
        }
    }

    /// Token used by nested SDK payload archives.
    pub fn sdk_token(&self) -> &'static str {
        match self {
            Arch::Ia32 => "x86",
            other => other.as_str(),
        }
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ia32" | "x86" => Ok(Arch::Ia32),
            "x64" | "x86_64" | "amd64" => Ok(Arch::X64),
            "arm" => Ok(Arch::Arm),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            _ => Err(format!("unknown architecture `{}`", s)),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The JavaScript runtime an addon is loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFamily {
    /// Plain Node.js
    Node,
    /// Electron (embeds its own Node)
    Electron,
    /// NW.js (embeds its own Node)
    NodeWebkit,
}

impl RuntimeFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeFamily::Node => "node",
            RuntimeFamily::Electron => "electron",
            RuntimeFamily::NodeWebkit => "node-webkit",
        }
    }

    /// Runtime name understood by cmake-js.
    pub fn cmake_js_name(&self) -> &'static str {
        match self {
            RuntimeFamily::Node => "node",
            RuntimeFamily::Electron => "electron",
            RuntimeFamily::NodeWebkit => "nw",
        }
    }

    /// Header download location for node-gyp, when it differs from Node's.
    pub fn headers_url(&self) -> Option<&'static str> {
        match self {
            RuntimeFamily::Electron => Some("https://electronjs.org/headers"),
            _ => None,
        }
    }

    /// Package name a module depends on to target this runtime.
    fn dependency_name(&self) -> Option<&'static str> {
        match self {
            RuntimeFamily::Node => None,
            RuntimeFamily::Electron => Some("electron"),
            RuntimeFamily::NodeWebkit => Some("nw"),
        }
    }
}

impl FromStr for RuntimeFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(RuntimeFamily::Node),
            "electron" => Ok(RuntimeFamily::Electron),
            "node-webkit" | "nw" => Ok(RuntimeFamily::NodeWebkit),
            _ => Err(format!("unknown runtime `{}`", s)),
        }
    }
}

impl fmt::Display for RuntimeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An embedding runtime the module targets instead of plain Node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedRuntime {
    pub family: RuntimeFamily,
    pub version: Version,
}

impl EmbeddedRuntime {
    /// Find an electron or nw dependency in the module manifest.
    pub fn from_manifest(manifest: &Manifest) -> Option<Self> {
        [RuntimeFamily::Electron, RuntimeFamily::NodeWebkit]
            .into_iter()
            .find_map(|family| {
                let name = family.dependency_name()?;
                let requirement = manifest.dependency_requirement(name)?;
                let version = parse_lenient_version(requirement)?;
                Some(EmbeddedRuntime { family, version })
            })
    }

    /// Read the runtime npm passes down when rebuilding for electron or nw.
    pub fn from_env() -> Option<Self> {
        let runtime = std::env::var("npm_config_runtime").ok()?;
        let family = runtime.parse::<RuntimeFamily>().ok()?;
        if family == RuntimeFamily::Node {
            return None;
        }
        let target = std::env::var("npm_config_target").ok()?;
        let version = parse_lenient_version(&target)?;
        Some(EmbeddedRuntime { family, version })
    }
}

/// Raw facts about the machine, gathered once per invocation.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    /// Rust OS name (`std::env::consts::OS`)
    pub os: String,
    /// Rust architecture name (`std::env::consts::ARCH`)
    pub arch: String,
    /// Version of the `node` binary on PATH, if any
    pub node_version: Option<Version>,
    /// Embedding runtime the module targets, if any
    pub embedded: Option<EmbeddedRuntime>,
}

impl HostEnvironment {
    /// Probe the current process environment.
    pub fn probe(manifest: Option<&Manifest>) -> Self {
        let embedded =
            EmbeddedRuntime::from_env().or_else(|| manifest.and_then(EmbeddedRuntime::from_manifest));

        HostEnvironment {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            node_version: probe_node_version(),
            embedded,
        }
    }
}

fn probe_node_version() -> Option<Version> {
    let node = find_executable("node")?;
    let output = ProcessBuilder::new(node).arg("--version").exec().ok()?;
    if !output.status.success() {
        return None;
    }
    let version = parse_lenient_version(String::from_utf8_lossy(&output.stdout).trim());
    tracing::debug!("node on PATH reports {:?}", version);
    version
}

/// The resolved identity used to query the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDescriptor {
    pub platform: Platform,
    pub arch: Arch,
    pub runtime_family: RuntimeFamily,
    pub runtime_version: Version,
    /// `None` when the runtime release is outside the known ABI tables.
    pub abi_tag: Option<AbiTag>,
}

impl HostDescriptor {
    pub fn new(
        platform: Platform,
        arch: Arch,
        runtime_family: RuntimeFamily,
        runtime_version: Version,
    ) -> Self {
        let abi_tag = abi_tag(runtime_family, &runtime_version);
        HostDescriptor {
            platform,
            arch,
            runtime_family,
            runtime_version,
            abi_tag,
        }
    }

    /// Resolve the descriptor from probed facts.
    ///
    /// An embedded runtime takes precedence over the Node on PATH.
    pub fn resolve(
        env: &HostEnvironment,
        arch_override: Option<Arch>,
    ) -> Result<Self, ProvisionError> {
        let platform = Platform::from_os(&env.os).ok_or_else(|| {
            ProvisionError::Configuration(format!("unsupported platform `{}`", env.os))
        })?;

        let arch = match arch_override {
            Some(arch) => arch,
            None => Arch::from_rust_arch(&env.arch).ok_or_else(|| {
                ProvisionError::Configuration(format!("unsupported architecture `{}`", env.arch))
            })?,
        };

        let (family, version) = match &env.embedded {
            Some(embedded) => (embedded.family, embedded.version.clone()),
            None => {
                let version = env.node_version.clone().ok_or_else(|| {
                    ProvisionError::Configuration(
                        "unable to determine the Node.js version (is `node` on PATH?)".to_string(),
                    )
                })?;
                (RuntimeFamily::Node, version)
            }
        };

        let host = HostDescriptor::new(platform, arch, family, version);
        if host.abi_tag.is_none() {
            tracing::warn!(
                "no known ABI version for {} {}; prebuilt addons cannot match",
                host.runtime_family,
                host.runtime_version
            );
        }
        Ok(host)
    }
}

impl fmt::Display for HostDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} ({} {}",
            self.platform, self.arch, self.runtime_family, self.runtime_version
        )?;
        match self.abi_tag {
            Some(abi) => write!(f, ", abi{})", abi),
            None => write!(f, ", unknown abi)"),
        }
    }
}

/// Parse a version the way package.json and `node --version` spell them.
///
/// Strips a leading `v` and range operators (`^22.3.1`), and pads partial
/// versions (`22` -> `22.0.0`).
pub fn parse_lenient_version(raw: &str) -> Option<Version> {
    let trimmed = raw
        .trim()
        .trim_start_matches(|c: char| matches!(c, '^' | '~' | '=' | '>' | '<' | 'v' | ' '));

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let release = trimmed.split(['-', '+']).next()?;
    let mut parts = release.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = match parts.next() {
        Some(p) => p.parse::<u64>().ok()?,
        None => 0,
    };
    let patch = match parts.next() {
        Some(p) => p.parse::<u64>().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(Version::new(major, minor, patch))
}
