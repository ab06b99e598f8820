//! Shared utilities

pub mod archive;
pub mod config;
pub mod context;
pub mod fs;
pub mod process;

pub use context::ProjectContext;
pub use process::{CommandRunner, ProcessBuilder, SystemRunner};
