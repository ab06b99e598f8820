//! Implementation of `node-prebuild clean`.

use std::path::PathBuf;

use crate::core::errors::ProvisionError;
use crate::util::context::ProjectContext;
use crate::util::fs::remove_dir_all_if_exists;

/// Remove the SDK and staging directories.
///
/// Missing directories are not an error. Returns the directories that
/// actually existed and were removed.
pub fn clean(ctx: &ProjectContext) -> Result<Vec<PathBuf>, ProvisionError> {
    let mut removed = Vec::new();
    for dir in [ctx.sdk_dir(), ctx.staging_dir()] {
        let existed =
            remove_dir_all_if_exists(&dir).map_err(|e| ProvisionError::filesystem(&dir, e))?;
        if existed {
            tracing::info!("Removed {}", dir.display());
            removed.push(dir);
        } else {
            tracing::debug!("{} does not exist", dir.display());
        }
    }
    Ok(removed)
}
