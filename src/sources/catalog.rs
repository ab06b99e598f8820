//! Remote catalog of published artifacts.
//!
//! # Catalog Format
//!
//! The endpoint returns one JSON document grouping entries by artifact class
//! and then by package version. The default endpoint files SDKs under
//! `message` and addons under `electron`:
//!
//! ```json
//! {
//!   "message":  { "1.2.3": [ { "filename": "mylib-v1.2.3-linux-x64.tar.gz", "cdnlink": "https://..." } ] },
//!   "electron": { "1.2.3": [ { "filename": "mylib-v1.2.3-abi108-linux-x64.tar.gz", "cdnlink": "https://..." } ] }
//! }
//! ```
//!
//! Top-level values that are not objects of arrays (status codes, messages)
//! are ignored. Object order is preserved, since the matcher's tie-break
//! depends on it.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::core::artifact_key::ArtifactClass;
use crate::core::errors::ProvisionError;
use crate::sources::http::Transport;

/// Catalog endpoint used when none is configured.
pub const DEFAULT_CATALOG_URL: &str = "http://publish.netease.im/api/list";

/// One published archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Archive file name, encoding the artifact key
    pub filename: String,
    /// Where to download it
    #[serde(rename = "cdnlink")]
    pub download_url: String,
}

/// The entries published for one version key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBucket {
    pub version_key: String,
    pub entries: Vec<CatalogEntry>,
}

/// Top-level catalog keys for each artifact class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogKeys {
    pub sdk: String,
    pub addon: String,
}

impl Default for CatalogKeys {
    fn default() -> Self {
        CatalogKeys {
            sdk: "message".to_string(),
            addon: "electron".to_string(),
        }
    }
}

impl CatalogKeys {
    pub fn key(&self, class: ArtifactClass) -> &str {
        match class {
            ArtifactClass::Sdk => &self.sdk,
            ArtifactClass::Addon => &self.addon,
        }
    }
}

/// A fetched catalog: class key -> ordered version buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    classes: Vec<(String, Vec<VersionBucket>)>,
}

impl Catalog {
    /// Parse a catalog document.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let document: Value = serde_json::from_slice(body).context("catalog is not valid JSON")?;
        let Value::Object(top) = document else {
            bail!("catalog root is not a JSON object");
        };

        let mut classes = Vec::new();
        for (class_key, value) in top {
            let Value::Object(versions) = value else {
                tracing::debug!("ignoring non-class catalog key `{}`", class_key);
                continue;
            };
            if !versions.values().all(Value::is_array) {
                tracing::debug!("ignoring non-class catalog key `{}`", class_key);
                continue;
            }

            let mut buckets = Vec::with_capacity(versions.len());
            for (version_key, entries) in versions {
                let entries: Vec<CatalogEntry> = serde_json::from_value(entries)
                    .with_context(|| {
                        format!("malformed entries under `{}`.`{}`", class_key, version_key)
                    })?;
                buckets.push(VersionBucket {
                    version_key,
                    entries,
                });
            }
            classes.push((class_key, buckets));
        }

        Ok(Catalog { classes })
    }

    /// Version buckets for a class key.
    pub fn class(&self, class_key: &str) -> Option<&[VersionBucket]> {
        self.classes
            .iter()
            .find(|(key, _)| key == class_key)
            .map(|(_, buckets)| buckets.as_slice())
    }

    /// Buckets of a class whose key has the same release segment as `version`.
    pub fn buckets_for<'a>(
        &'a self,
        class_key: &str,
        version: &str,
    ) -> impl Iterator<Item = &'a VersionBucket> + 'a {
        let wanted = release_segment(version);
        self.class(class_key)
            .unwrap_or_default()
            .iter()
            .filter(move |bucket| release_segment(&bucket.version_key) == wanted)
    }
}

/// The `major.minor.patch` part of a version, without prerelease or build
/// metadata. Strings that are not semver fall back to their text before the
/// first `-` or `+`.
pub fn release_segment(version: &str) -> String {
    let trimmed = version.trim().trim_start_matches('v');
    match semver::Version::parse(trimmed) {
        Ok(v) => format!("{}.{}.{}", v.major, v.minor, v.patch),
        Err(_) => trimmed
            .split(['-', '+'])
            .next()
            .unwrap_or(trimmed)
            .to_string(),
    }
}

/// Client for the catalog endpoint.
pub struct CatalogClient<'a> {
    transport: &'a dyn Transport,
    url: Url,
}

impl<'a> CatalogClient<'a> {
    pub fn new(transport: &'a dyn Transport, url: Url) -> Self {
        CatalogClient { transport, url }
    }

    /// Fetch and parse the catalog. One request, no retries, no caching.
    pub fn fetch(&self) -> Result<Catalog, ProvisionError> {
        tracing::info!("Fetching artifact catalog from {}", self.url);

        let fetch_error = |err: anyhow::Error| ProvisionError::CatalogFetch {
            url: self.url.to_string(),
            reason: format!("{:#}", err),
        };

        let body = self.transport.get(self.url.as_str()).map_err(fetch_error)?;
        let catalog = Catalog::from_json(&body).map_err(fetch_error)?;

        tracing::debug!("catalog has {} artifact classes", catalog.classes.len());
        Ok(catalog)
    }
}
