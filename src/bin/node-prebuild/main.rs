//! node-prebuild CLI - install prebuilt native addons for Node.js modules

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use node_prebuild::ProvisionError;

mod cli;
mod commands;

use cli::{Cli, Commands, MessageFormat};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let format = cli.message_format;
    if let Err(e) = run(cli) {
        report(&e, format);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("node_prebuild=debug")
    } else {
        EnvFilter::new("node_prebuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Clean(args) => commands::clean::execute(args),
        Commands::Install(args) => commands::install::execute(args),
        Commands::Reinstall(args) => commands::reinstall::execute(args),
        Commands::Build(args) => commands::build::execute(args),
    }
}

fn report(err: &anyhow::Error, format: MessageFormat) {
    match format {
        MessageFormat::Human => eprintln!("error: {:#}", err),
        MessageFormat::Json => {
            let value = match err.downcast_ref::<ProvisionError>() {
                Some(provision) => provision.to_json(),
                None => serde_json::json!({
                    "error": { "kind": "Error", "message": format!("{:#}", err) }
                }),
            };
            eprintln!("{}", value);
        }
    }
}
