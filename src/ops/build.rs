//! Implementation of `node-prebuild build`.
//!
//! Builds every requested runtime x version x architecture combination,
//! one after another, and optionally packs each result for publishing.

use std::path::PathBuf;

use crate::builder::fallback::FallbackBuilder;
use crate::builder::toolchain::BuildSpec;
use crate::core::abi::{abi_tag, AbiTag};
use crate::core::artifact_key::ArtifactKey;
use crate::core::errors::ProvisionError;
use crate::core::host::{parse_lenient_version, Arch, HostEnvironment, Platform, RuntimeFamily};
use crate::ops::fetch::InstallResult;
use crate::ops::pack::pack_files;
use crate::util::config::ResolvedBuildOptions;
use crate::util::context::ProjectContext;
use crate::util::process::CommandRunner;

/// Result of building one combination.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub spec: BuildSpec,
    pub installed: InstallResult,
    /// The packed archive, when packing was requested
    pub package: Option<PathBuf>,
}

/// Expand the requested runtimes, versions and architectures into build specs.
///
/// Unset versions default to the host's runtime and unset architectures to
/// the host's. When packing, every combination must have a known ABI tag;
/// this is checked before anything is built.
pub fn build_matrix(
    opts: &ResolvedBuildOptions,
    env: &HostEnvironment,
) -> Result<Vec<BuildSpec>, ProvisionError> {
    let platform = Platform::from_os(&env.os)
        .ok_or_else(|| ProvisionError::Configuration(format!("unsupported platform `{}`", env.os)))?;

    let arches = if opts.arches.is_empty() {
        let host_arch = Arch::from_rust_arch(&env.arch).ok_or_else(|| {
            ProvisionError::Configuration(format!("unsupported architecture `{}`", env.arch))
        })?;
        vec![host_arch]
    } else {
        opts.arches.clone()
    };

    let mut specs = Vec::new();
    for &runtime in &opts.runtimes {
        let versions = if opts.runtime_versions.is_empty() {
            vec![default_runtime_version(runtime, env)?]
        } else {
            opts.runtime_versions
                .iter()
                .map(|raw| {
                    parse_lenient_version(raw).ok_or_else(|| {
                        ProvisionError::Configuration(format!("invalid runtime version `{}`", raw))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        for version in versions {
            if opts.pack && abi_tag(runtime, &version).is_none() {
                return Err(ProvisionError::Configuration(format!(
                    "no known ABI version for {} {}; cannot name a package for it",
                    runtime, version
                )));
            }
            for &arch in &arches {
                specs.push(BuildSpec::new(
                    opts.toolchain,
                    runtime,
                    version.clone(),
                    platform,
                    arch,
                ));
            }
        }
    }
    Ok(specs)
}

fn default_runtime_version(
    runtime: RuntimeFamily,
    env: &HostEnvironment,
) -> Result<semver::Version, ProvisionError> {
    if let Some(embedded) = env.embedded.as_ref().filter(|e| e.family == runtime) {
        return Ok(embedded.version.clone());
    }
    match runtime {
        RuntimeFamily::Node => env.node_version.clone().ok_or_else(|| {
            ProvisionError::Configuration(
                "unable to determine the Node.js version (is `node` on PATH?)".to_string(),
            )
        }),
        other => Err(ProvisionError::Configuration(format!(
            "no runtime version given for {}",
            other
        ))),
    }
}

/// Build, install into the binary directory and optionally pack each combination.
pub fn build(
    ctx: &ProjectContext,
    env: &HostEnvironment,
    opts: &ResolvedBuildOptions,
    runner: &dyn CommandRunner,
) -> Result<Vec<BuildOutput>, ProvisionError> {
    let manifest = ctx.manifest()?;
    let specs = build_matrix(opts, env)?;
    let binary_dir = ctx.resolve(&opts.binary_dir);
    let package_dir = ctx.resolve(&opts.package_dir);

    tracing::info!("Building {} combination(s) with {}", specs.len(), opts.toolchain);

    let mut outputs = Vec::with_capacity(specs.len());
    for spec in specs {
        let installed = FallbackBuilder::new(runner, ctx.root()).build_and_install(&spec, &binary_dir)?;

        let package = if opts.pack {
            let abi = packable_abi(&spec)?;
            let key = ArtifactKey::for_addon(
                &opts.addon_name,
                &manifest.version,
                abi,
                spec.platform,
                spec.arch,
            );
            Some(pack_files(&binary_dir, &installed.local_paths, &package_dir, &key)?)
        } else {
            None
        };

        outputs.push(BuildOutput {
            spec,
            installed,
            package,
        });
    }
    Ok(outputs)
}

fn packable_abi(spec: &BuildSpec) -> Result<AbiTag, ProvisionError> {
    abi_tag(spec.runtime_family, &spec.runtime_version).ok_or_else(|| {
        ProvisionError::Configuration(format!(
            "no known ABI version for {} {}",
            spec.runtime_family, spec.runtime_version
        ))
    })
}
