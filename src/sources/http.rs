//! HTTP transport for the catalog and artifact downloads.

use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Fetches the body of a URL.
///
/// Catalog and artifact downloads go through this trait so tests can
/// substitute a recording mock.
pub trait Transport {
    /// GET `url` and return the response body; non-2xx statuses are errors.
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking reqwest client with a request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("node-prebuild/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            bail!("HTTP {}", response.status());
        }

        let body = response
            .bytes()
            .with_context(|| "failed to read response body")?;
        Ok(body.to_vec())
    }
}
