//! `node-prebuild build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use node_prebuild::ops::build;
use node_prebuild::util::config::{BuildFlags, ResolvedBuildOptions};
use node_prebuild::util::{ProjectContext, SystemRunner};
use node_prebuild::HostEnvironment;

pub fn execute(args: BuildArgs) -> Result<()> {
    let ctx = ProjectContext::new()?;

    let flags = BuildFlags {
        build_tool: args.build_tool,
        binary_dir: args.binary_dir,
        package_dir: args.package_dir,
        runtime: args.runtime,
        runtime_version: args.runtime_version,
        arch: args.arch,
        pack: args.pack,
    };
    let (config, package_name) = match ctx.manifest_opt() {
        Some(manifest) => (manifest.prebuild.clone(), manifest.name.as_str()),
        None => (Default::default(), ""),
    };
    let opts = ResolvedBuildOptions::resolve(&flags, &config, package_name)?;

    let env = HostEnvironment::probe(ctx.manifest_opt());
    let runner = SystemRunner::new(Some(opts.build_timeout));

    let outputs = build(&ctx, &env, &opts, &runner)?;
    for output in &outputs {
        match &output.package {
            Some(package) => eprintln!("      Packed {}", package.display()),
            None => eprintln!(
                "    Finished {} {} ({})",
                output.spec.runtime_family, output.spec.runtime_version, output.spec.arch
            ),
        }
    }

    Ok(())
}
