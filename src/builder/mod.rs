//! Local addon builds.
//!
//! This module drives the cmake-js and node-gyp toolchains when no
//! prebuilt addon fits the host, and for the `build` command.

pub mod fallback;
pub mod toolchain;

pub use fallback::{BuildState, BuildStep, FallbackBuilder};
pub use toolchain::{generator_for, BuildSpec, ToolchainKind};
