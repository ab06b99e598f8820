//! Test utilities and mocks for node-prebuild unit tests.
//!
//! This module provides mock implementations of the two seams that touch
//! the outside world: the HTTP transport and the toolchain command runner.
//!
//! # Example
//!
//! ```rust,ignore
//! use node_prebuild::test_support::{MockHttpResponse, MockTransport, MockRunner};
//!
//! #[test]
//! fn test_example() {
//!     let transport = MockTransport::new();
//!     transport.mock_url("https://cdn/a.tar.gz", MockHttpResponse::ok(tar_gz_bytes(&[])));
//!
//!     let runner = MockRunner::new().with_outputs(&["addon.node"]);
//!
//!     // Use mocks in tests...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::builder::toolchain::RELEASE_OUTPUT_DIR;
use crate::sources::http::Transport;
use crate::util::process::{CommandRunner, ProcessBuilder};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockHttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockHttpResponse {
    /// Create a successful response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        MockHttpResponse {
            status: 200,
            body: body.into(),
        }
    }

    /// Create a not found response.
    pub fn not_found() -> Self {
        MockHttpResponse {
            status: 404,
            body: b"Not Found".to_vec(),
        }
    }

    /// Create a server error response.
    pub fn server_error(message: &str) -> Self {
        MockHttpResponse {
            status: 500,
            body: message.as_bytes().to_vec(),
        }
    }

    /// Check if this is a successful response.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Recording transport for catalog and archive requests.
///
/// Unmatched URLs fail like an unreachable host.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, MockHttpResponse>>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// Add a response for a URL.
    pub fn mock_url(&self, url: &str, response: MockHttpResponse) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
        self
    }

    /// Get all requested URLs, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());

        let Some(response) = self.responses.lock().unwrap().get(url).cloned() else {
            bail!("no mock response for URL: {}", url);
        };
        if !response.is_success() {
            bail!("HTTP {}", response.status);
        }
        Ok(response.body)
    }
}

/// Recording command runner standing in for npx and the toolchains.
///
/// Every command is recorded by its display string. A `clean` step removes
/// the `build` directory of the command's working directory, and a `build`
/// step writes the configured output files under its toolchain output
/// directory.
#[derive(Debug)]
pub struct MockRunner {
    commands: Mutex<Vec<String>>,
    fail_on: Option<String>,
    outputs: Vec<PathBuf>,
    launcher: bool,
}

impl Default for MockRunner {
    fn default() -> Self {
        MockRunner {
            commands: Mutex::new(Vec::new()),
            fail_on: None,
            outputs: Vec::new(),
            launcher: true,
        }
    }
}

impl MockRunner {
    /// Create a runner whose commands all succeed without producing files.
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Fail any command whose display string contains `pattern`.
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.to_string());
        self
    }

    /// Files (relative to the output directory) each build step produces.
    pub fn with_outputs(mut self, outputs: &[&str]) -> Self {
        self.outputs = outputs.iter().map(PathBuf::from).collect();
        self
    }

    /// Pretend `npx` is not installed.
    pub fn without_launcher(mut self) -> Self {
        self.launcher = false;
        self
    }

    /// Get all executed commands, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandRunner for MockRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.launcher.then(|| PathBuf::from(program))
    }

    fn run(&self, cmd: &ProcessBuilder) -> Result<()> {
        let display = cmd.display_command();
        self.commands.lock().unwrap().push(display.clone());

        if let Some(pattern) = &self.fail_on {
            if display.contains(pattern.as_str()) {
                bail!("`{}` failed with exit code Some(1)", display);
            }
        }

        let cwd = cmd.get_cwd().map(Path::to_path_buf).unwrap_or_default();
        let step = cmd.get_args().get(1).map(String::as_str);
        if step == Some("clean") {
            let build_dir = cwd.join("build");
            if build_dir.exists() {
                std::fs::remove_dir_all(&build_dir)?;
            }
        }
        if step == Some("build") {
            let output_dir = cwd.join(RELEASE_OUTPUT_DIR);
            for output in &self.outputs {
                let path = output_dir.join(output);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, output.to_string_lossy().as_bytes())?;
            }
        }
        Ok(())
    }
}
