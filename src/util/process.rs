//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use wait_timeout::ChildExt;

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command, capturing its output.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))
    }

    /// Execute with inherited stdio and require success within `timeout`.
    ///
    /// The child is killed when the timeout expires.
    pub fn exec_streaming(&self, timeout: Option<Duration>) -> Result<()> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.display_command()))?;

        let status = match timeout {
            Some(limit) => match child
                .wait_timeout(limit)
                .with_context(|| format!("failed to wait for `{}`", self.display_command()))?
            {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    bail!(
                        "`{}` timed out after {}s",
                        self.display_command(),
                        limit.as_secs()
                    );
                }
            },
            None => child
                .wait()
                .with_context(|| format!("failed to wait for `{}`", self.display_command()))?,
        };

        if !status.success() {
            bail!(
                "`{}` failed with exit code {:?}",
                self.display_command(),
                status.code()
            );
        }
        Ok(())
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|arg| {
            if arg.contains(' ') {
                format!("\"{}\"", arg)
            } else {
                arg.clone()
            }
        }));
        parts.join(" ")
    }
}

/// Runs external toolchain commands.
///
/// The fallback builder talks to toolchains only through this trait.
pub trait CommandRunner {
    /// Resolve a program name to an executable path.
    fn locate(&self, program: &str) -> Option<PathBuf> {
        find_executable(program)
    }

    /// Run a command to completion, failing on a non-zero exit.
    fn run(&self, cmd: &ProcessBuilder) -> Result<()>;
}

/// Runs commands on the real system, streaming their output.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        SystemRunner { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<()> {
        cmd.exec_streaming(self.timeout)
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command_quotes_spaces() {
        let pb = ProcessBuilder::new("npx").args(["cmake-js", "configure", "-G", "Unix Makefiles"]);

        assert_eq!(
            pb.display_command(),
            "npx cmake-js configure -G \"Unix Makefiles\""
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_captures_output() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_streaming_reports_failure() {
        let err = ProcessBuilder::new("false")
            .exec_streaming(Some(Duration::from_secs(10)))
            .unwrap_err();
        assert!(err.to_string().contains("failed with exit code"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_streaming_times_out() {
        let err = ProcessBuilder::new("sleep")
            .arg("5")
            .exec_streaming(Some(Duration::from_millis(100)))
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
