//! Addon build toolchains.
//!
//! Both toolchains are Node packages invoked through `npx`. This module
//! only describes their command lines; running them is the fallback
//! builder's job.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use semver::Version;

use crate::core::host::{Arch, HostDescriptor, Platform, RuntimeFamily};

/// Directory both toolchains write release binaries into.
pub const RELEASE_OUTPUT_DIR: &str = "build/Release";

/// A supported build toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolchainKind {
    CmakeJs,
    NodeGyp,
}

impl ToolchainKind {
    /// The npm package name, also the command `npx` runs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainKind::CmakeJs => "cmake-js",
            ToolchainKind::NodeGyp => "node-gyp",
        }
    }

    /// Where the toolchain leaves compiled binaries, relative to the module root.
    pub fn output_dir(&self) -> &'static Path {
        Path::new(RELEASE_OUTPUT_DIR)
    }

    /// Arguments after `npx` that remove the previous build tree.
    pub fn clean_args(&self) -> Vec<String> {
        vec![self.as_str().to_string(), "clean".to_string()]
    }

    /// Arguments after `npx` for the configure step.
    pub fn configure_args(&self, spec: &BuildSpec) -> Vec<String> {
        let mut args = vec![self.as_str().to_string(), "configure".to_string()];
        match self {
            ToolchainKind::CmakeJs => {
                args.push("-G".to_string());
                args.push(spec.generator.to_string());
                if let Some(platform) = generator_platform(spec.platform, spec.arch) {
                    args.push("-A".to_string());
                    args.push(platform.to_string());
                }
                args.extend(cmake_js_runtime_args(spec));
            }
            ToolchainKind::NodeGyp => {
                args.extend(node_gyp_target_args(spec));
            }
        }
        args
    }

    /// Arguments after `npx` for the compile step.
    pub fn build_args(&self, spec: &BuildSpec) -> Vec<String> {
        let mut args = vec![self.as_str().to_string(), "build".to_string()];
        match self {
            ToolchainKind::CmakeJs => args.extend(cmake_js_runtime_args(spec)),
            ToolchainKind::NodeGyp => args.extend(node_gyp_target_args(spec)),
        }
        args
    }
}

impl FromStr for ToolchainKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cmake-js" => Ok(ToolchainKind::CmakeJs),
            "node-gyp" | "node-pre-gyp" => Ok(ToolchainKind::NodeGyp),
            _ => Err(format!(
                "unknown build tool `{}` (expected `cmake-js` or `node-gyp`)",
                s
            )),
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn cmake_js_runtime_args(spec: &BuildSpec) -> Vec<String> {
    vec![
        "--runtime".to_string(),
        spec.runtime_family.cmake_js_name().to_string(),
        "--runtime-version".to_string(),
        spec.runtime_version.to_string(),
        "--arch".to_string(),
        spec.arch.as_str().to_string(),
    ]
}

fn node_gyp_target_args(spec: &BuildSpec) -> Vec<String> {
    let mut args = vec![
        "--target".to_string(),
        spec.runtime_version.to_string(),
        "--arch".to_string(),
        spec.arch.as_str().to_string(),
    ];
    if let Some(url) = spec.runtime_family.headers_url() {
        args.push("--dist-url".to_string());
        args.push(url.to_string());
    }
    args
}

/// CMake generator for a platform.
pub fn generator_for(platform: Platform) -> &'static str {
    match platform {
        Platform::Windows => "Visual Studio 15 2017",
        Platform::Macos => "Xcode",
        Platform::Linux => "Unix Makefiles",
    }
}

/// The Visual Studio `-A` platform; other generators take none.
pub fn generator_platform(platform: Platform, arch: Arch) -> Option<&'static str> {
    if platform != Platform::Windows {
        return None;
    }
    Some(match arch {
        Arch::Ia32 => "Win32",
        Arch::X64 => "x64",
        Arch::Arm => "ARM",
        Arch::Arm64 => "ARM64",
    })
}

/// Everything needed to drive one toolchain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub toolchain: ToolchainKind,
    pub runtime_family: RuntimeFamily,
    pub runtime_version: Version,
    pub arch: Arch,
    pub platform: Platform,
    pub generator: &'static str,
}

impl BuildSpec {
    pub fn new(
        toolchain: ToolchainKind,
        runtime_family: RuntimeFamily,
        runtime_version: Version,
        platform: Platform,
        arch: Arch,
    ) -> Self {
        BuildSpec {
            toolchain,
            runtime_family,
            runtime_version,
            arch,
            platform,
            generator: generator_for(platform),
        }
    }

    /// Build for exactly the resolved host.
    pub fn for_host(toolchain: ToolchainKind, host: &HostDescriptor) -> Self {
        Self::new(
            toolchain,
            host.runtime_family,
            host.runtime_version.clone(),
            host.platform,
            host.arch,
        )
    }
}
