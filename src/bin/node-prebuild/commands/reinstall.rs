//! `node-prebuild reinstall` command

use anyhow::Result;

use crate::cli::InstallArgs;
use crate::commands::install::{http_transport, prepare, print_outcome};
use node_prebuild::ops::reinstall;
use node_prebuild::util::{ProjectContext, SystemRunner};

pub fn execute(args: InstallArgs) -> Result<()> {
    let ctx = ProjectContext::new()?;

    let (host, opts) = prepare(&ctx, &args)?;
    let transport = http_transport(&opts)?;
    let runner = SystemRunner::new(Some(opts.build_timeout));

    let outcome = reinstall(&ctx, &host, &opts, &transport, &runner)?;
    print_outcome(&outcome);
    Ok(())
}
