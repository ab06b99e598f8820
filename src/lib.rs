//! node-prebuild - install prebuilt native addons for Node.js modules
//!
//! This crate resolves the running host (platform, architecture, runtime and
//! ABI), looks it up in a remote catalog of published archives, installs the
//! matching SDK payload and addon binary, and falls back to a local cmake-js
//! or node-gyp build when no prebuilt addon fits.
//!
//! The tool is not reentrant: two invocations against the same module
//! directory race on the SDK, binary and staging directories.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and mocks for unit tests.
///
/// Provides a recording HTTP transport, a recording command runner and
/// archive fixtures so operations can run without network or toolchains.
#[cfg(test)]
pub mod test_support;

pub use core::{
    abi::AbiTag,
    artifact_key::{ArtifactClass, ArtifactKey},
    errors::ProvisionError,
    host::{Arch, HostDescriptor, HostEnvironment, Platform, RuntimeFamily},
    manifest::Manifest,
};

pub use resolver::{match_artifact, ArtifactRequest};
pub use util::context::ProjectContext;
