//! `node-prebuild install` command

use anyhow::Result;

use crate::cli::InstallArgs;
use node_prebuild::ops::{install, sdk_installed, InstallOutcome};
use node_prebuild::sources::HttpTransport;
use node_prebuild::util::config::{InstallFlags, ResolvedInstallOptions};
use node_prebuild::util::{ProjectContext, SystemRunner};
use node_prebuild::{HostDescriptor, HostEnvironment, ProvisionError};

pub fn execute(args: InstallArgs) -> Result<()> {
    let ctx = ProjectContext::new()?;

    if sdk_installed(&ctx) {
        eprintln!(
            "     Skipped SDK already installed in {}",
            ctx.sdk_dir().display()
        );
        return Ok(());
    }

    let (host, opts) = prepare(&ctx, &args)?;
    let transport = http_transport(&opts)?;
    let runner = SystemRunner::new(Some(opts.build_timeout));

    let outcome = install(&ctx, &host, &opts, &transport, &runner)?;
    print_outcome(&outcome);
    Ok(())
}

/// Resolve options and the host before anything touches disk or network.
pub fn prepare(
    ctx: &ProjectContext,
    args: &InstallArgs,
) -> Result<(HostDescriptor, ResolvedInstallOptions)> {
    let manifest = ctx.manifest()?;
    let flags = InstallFlags {
        name: args.name.clone(),
        name_addon: args.name_addon.clone(),
        name_sdk: args.name_sdk.clone(),
        arch: args.arch.clone(),
        fall_back_to_build: args.fall_back_to_build.clone(),
        catalog_url: args.catalog_url.clone(),
    };
    let opts = ResolvedInstallOptions::resolve(&flags, &manifest.prebuild, &manifest.name)?;

    let env = HostEnvironment::probe(Some(manifest));
    let host = HostDescriptor::resolve(&env, opts.arch)?;
    tracing::info!("Resolved host {}", host);

    Ok((host, opts))
}

pub fn http_transport(opts: &ResolvedInstallOptions) -> Result<HttpTransport> {
    let transport = HttpTransport::new(opts.timeout)
        .map_err(|e| ProvisionError::Configuration(format!("{:#}", e)))?;
    Ok(transport)
}

pub fn print_outcome(outcome: &InstallOutcome) {
    match outcome {
        InstallOutcome::AlreadyInstalled => eprintln!("     Skipped SDK already installed"),
        InstallOutcome::Installed { sdk, addon } => {
            eprintln!(
                "    Finished {} SDK file(s), {} addon file(s) ({:?})",
                sdk.local_paths.len(),
                addon.local_paths.len(),
                addon.source_kind
            );
        }
    }
}
