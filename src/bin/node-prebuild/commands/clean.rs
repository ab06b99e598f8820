//! `node-prebuild clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use node_prebuild::ops::clean;
use node_prebuild::util::ProjectContext;

pub fn execute(_args: CleanArgs) -> Result<()> {
    let ctx = ProjectContext::new()?;

    let removed = clean(&ctx)?;
    if removed.is_empty() {
        eprintln!("     Nothing to clean");
    }

    Ok(())
}
