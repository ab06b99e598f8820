//! Artifact matching.
//!
//! Given a fetched catalog and a resolved host, pick the one published
//! archive that fits. Matching is pure: all I/O happens before it.
//!
//! An entry matches when its decoded archive name has:
//! - the requested logical name
//! - the host platform and architecture
//! - for addons only, the host ABI tag
//!
//! and it sits in a version bucket whose release segment equals the
//! module's. When several entries match, the last one in catalog order wins.

use crate::core::artifact_key::{ArtifactClass, ArtifactKey};
use crate::core::errors::ProvisionError;
use crate::core::host::HostDescriptor;
use crate::sources::catalog::{Catalog, CatalogEntry, CatalogKeys};

/// What to look for in the catalog.
#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    pub class: ArtifactClass,
    pub logical_name: String,
    pub host: HostDescriptor,
    /// The module's own version; compared by release segment
    pub version_key: String,
}

impl ArtifactRequest {
    pub fn new(
        class: ArtifactClass,
        logical_name: impl Into<String>,
        host: HostDescriptor,
        version_key: impl Into<String>,
    ) -> Self {
        ArtifactRequest {
            class,
            logical_name: logical_name.into(),
            host,
            version_key: version_key.into(),
        }
    }

    /// Whether a decoded archive name satisfies this request.
    pub fn accepts(&self, key: &ArtifactKey) -> bool {
        if key.name != self.logical_name {
            return false;
        }
        if key.platform() != Some(self.host.platform) || key.arch() != Some(self.host.arch) {
            return false;
        }
        if !self.class.is_abi_sensitive() {
            return true;
        }
        match (&key.abi, self.host.abi_tag) {
            (Some(abi), Some(host_abi)) => *abi == host_abi.to_string(),
            _ => false,
        }
    }

    /// The error reported when nothing matches.
    pub fn no_match(&self) -> ProvisionError {
        ProvisionError::NoMatchingArtifact {
            class: self.class,
            name: self.logical_name.clone(),
            host: self.host.to_string(),
        }
    }
}

/// Select the entry satisfying `request`, or `None`.
pub fn match_artifact<'a>(
    catalog: &'a Catalog,
    request: &ArtifactRequest,
    keys: &CatalogKeys,
) -> Option<&'a CatalogEntry> {
    let class_key = keys.key(request.class);

    let mut selected = None;
    for bucket in catalog.buckets_for(class_key, &request.version_key) {
        for entry in &bucket.entries {
            let Some(key) = ArtifactKey::decode(&entry.filename) else {
                tracing::debug!("skipping undecodable catalog entry `{}`", entry.filename);
                continue;
            };
            if request.accepts(&key) {
                tracing::trace!("candidate {}", entry.filename);
                selected = Some(entry);
            }
        }
    }

    match selected {
        Some(entry) => tracing::debug!("matched {} for {}", entry.filename, request.host),
        None => tracing::debug!(
            "no {} `{}` v{} in catalog for {}",
            request.class,
            request.logical_name,
            request.version_key,
            request.host
        ),
    }
    selected
}
