//! High-level operations.
//!
//! This module contains the implementation of node-prebuild commands.

pub mod build;
pub mod clean;
pub mod fetch;
pub mod install;
pub mod pack;

pub use build::{build, build_matrix, BuildOutput};
pub use clean::clean;
pub use fetch::{copy_shared_libraries, InstallResult, Installer, SourceKind};
pub use install::{install, reinstall, sdk_installed, InstallOutcome};
pub use pack::{pack, pack_files};
