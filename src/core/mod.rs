//! Core data structures.
//!
//! This module contains the foundational types shared by the resolver,
//! the installer and the packager:
//! - Host identity (platform, architecture, runtime, ABI tag)
//! - The archive key shared by packaging and matching
//! - The module's own `package.json` manifest
//! - Error kinds surfaced to callers

pub mod abi;
pub mod artifact_key;
pub mod errors;
pub mod host;
pub mod manifest;

pub use abi::{abi_tag, AbiTag};
pub use artifact_key::{ArtifactClass, ArtifactKey};
pub use errors::ProvisionError;
pub use host::{Arch, HostDescriptor, HostEnvironment, Platform, RuntimeFamily};
pub use manifest::{Manifest, PrebuildConfig, MANIFEST_NAME};
