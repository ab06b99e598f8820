//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// node-prebuild - install prebuilt native addons for Node.js modules
#[derive(Parser)]
#[command(name = "node-prebuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// How errors are reported on stderr
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove the SDK and download staging directories
    Clean(CleanArgs),

    /// Install the prebuilt SDK and addon, unless already installed
    Install(InstallArgs),

    /// Remove previous installs, then install
    Reinstall(InstallArgs),

    /// Build the addon for runtime/version/architecture combinations
    Build(BuildArgs),
}

#[derive(Args)]
pub struct CleanArgs {}

#[derive(Args)]
pub struct InstallArgs {
    /// Target architecture (ia32, x64, arm, arm64); defaults to the host
    #[arg(long)]
    pub arch: Option<String>,

    /// Build from source when no prebuilt addon fits (cmake-js or node-gyp)
    #[arg(long, value_name = "TOOL", num_args = 0..=1)]
    pub fall_back_to_build: Option<Option<String>>,

    /// Name shared by the addon and the SDK
    #[arg(short, long)]
    pub name: Option<String>,

    /// Name of the prebuilt addon
    #[arg(long)]
    pub name_addon: Option<String>,

    /// Name of the prebuilt SDK
    #[arg(long)]
    pub name_sdk: Option<String>,

    /// Artifact catalog endpoint
    #[arg(long, env = "NODE_PREBUILD_CATALOG_URL")]
    pub catalog_url: Option<String>,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Toolchain to build with (cmake-js or node-gyp)
    #[arg(long)]
    pub build_tool: Option<String>,

    /// Directory built binaries are copied into
    #[arg(long)]
    pub binary_dir: Option<PathBuf>,

    /// Directory packed archives are written to
    #[arg(long)]
    pub package_dir: Option<PathBuf>,

    /// Runtimes to build for (node, electron, node-webkit)
    #[arg(long, num_args = 1..)]
    pub runtime: Vec<String>,

    /// Runtime versions to build for; defaults to the host's
    #[arg(long, num_args = 1..)]
    pub runtime_version: Vec<String>,

    /// Architectures to build for; defaults to the host's
    #[arg(long, num_args = 1..)]
    pub arch: Vec<String>,

    /// Pack each build into a publishable archive
    #[arg(long)]
    pub pack: bool,
}
