//! Local addon builds when no prebuilt binary fits.
//!
//! A build moves through
//! `NotStarted -> ToolchainSelected -> Configured -> Compiled -> ArtifactsCopied`,
//! or stops in `Failed` recording the step that broke. Every failure is a
//! [`ProvisionError::BuildToolchain`] and is never recovered.
//!
//! Configuring always starts from a cleaned build tree, so one combination
//! never inherits another's cache or binaries.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::builder::toolchain::BuildSpec;
use crate::core::errors::ProvisionError;
use crate::ops::fetch::{InstallResult, SourceKind};
use crate::util::fs::{collect_artifact_files, copy_artifacts};
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Launcher every toolchain is run through.
const NPX: &str = "npx";

/// A step of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    SelectToolchain,
    Clean,
    Configure,
    Compile,
    CopyArtifacts,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::SelectToolchain => f.write_str("selecting the toolchain"),
            BuildStep::Clean => f.write_str("cleaning"),
            BuildStep::Configure => f.write_str("configuring"),
            BuildStep::Compile => f.write_str("compiling"),
            BuildStep::CopyArtifacts => f.write_str("copying artifacts"),
        }
    }
}

/// Where a build currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    NotStarted,
    ToolchainSelected,
    Configured,
    Compiled,
    ArtifactsCopied,
    Failed(BuildStep),
}

/// Drives a toolchain for one module directory.
pub struct FallbackBuilder<'a> {
    runner: &'a dyn CommandRunner,
    project_dir: PathBuf,
    state: BuildState,
}

impl<'a> FallbackBuilder<'a> {
    pub fn new(runner: &'a dyn CommandRunner, project_dir: &Path) -> Self {
        FallbackBuilder {
            runner,
            project_dir: project_dir.to_path_buf(),
            state: BuildState::NotStarted,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Clean, configure and compile, returning the toolchain output directory.
    pub fn compile(&mut self, spec: &BuildSpec) -> Result<PathBuf, ProvisionError> {
        self.state = BuildState::NotStarted;
        tracing::info!(
            "Building addon with {} for {} {} ({}-{})",
            spec.toolchain,
            spec.runtime_family,
            spec.runtime_version,
            spec.platform,
            spec.arch
        );

        let npx = match self.runner.locate(NPX) {
            Some(path) => path,
            None => {
                return Err(self.fail(
                    spec,
                    BuildStep::SelectToolchain,
                    format!("`{}` not found on PATH", NPX),
                ))
            }
        };
        self.state = BuildState::ToolchainSelected;

        let clean = ProcessBuilder::new(&npx)
            .args(spec.toolchain.clean_args())
            .cwd(&self.project_dir);
        self.run_step(spec, BuildStep::Clean, &clean)?;

        let configure = ProcessBuilder::new(&npx)
            .args(spec.toolchain.configure_args(spec))
            .cwd(&self.project_dir);
        self.run_step(spec, BuildStep::Configure, &configure)?;
        self.state = BuildState::Configured;

        let build = ProcessBuilder::new(&npx)
            .args(spec.toolchain.build_args(spec))
            .cwd(&self.project_dir);
        self.run_step(spec, BuildStep::Compile, &build)?;
        self.state = BuildState::Compiled;

        Ok(self.project_dir.join(spec.toolchain.output_dir()))
    }

    /// Compile, then copy the produced binaries into `dest`.
    pub fn build_and_install(
        &mut self,
        spec: &BuildSpec,
        dest: &Path,
    ) -> Result<InstallResult, ProvisionError> {
        let output_dir = self.compile(spec)?;

        let files = collect_artifact_files(&output_dir)
            .map_err(|e| self.fail(spec, BuildStep::CopyArtifacts, format!("{:#}", e)))?;
        if files.is_empty() {
            return Err(self.fail(
                spec,
                BuildStep::CopyArtifacts,
                format!("no addon binaries found in {}", output_dir.display()),
            ));
        }

        let local_paths = copy_artifacts(&files, dest)
            .map_err(|e| self.fail(spec, BuildStep::CopyArtifacts, format!("{:#}", e)))?;
        self.state = BuildState::ArtifactsCopied;

        tracing::info!("Built {} file(s) into {}", local_paths.len(), dest.display());
        Ok(InstallResult {
            success: true,
            source_kind: SourceKind::Built,
            local_paths,
        })
    }

    fn run_step(
        &mut self,
        spec: &BuildSpec,
        step: BuildStep,
        cmd: &ProcessBuilder,
    ) -> Result<(), ProvisionError> {
        tracing::debug!("running `{}`", cmd.display_command());
        self.runner
            .run(cmd)
            .map_err(|e| self.fail(spec, step, format!("{:#}", e)))
    }

    fn fail(&mut self, spec: &BuildSpec, step: BuildStep, reason: String) -> ProvisionError {
        self.state = BuildState::Failed(step);
        ProvisionError::BuildToolchain {
            toolchain: spec.toolchain.to_string(),
            step,
            reason,
        }
    }
}
