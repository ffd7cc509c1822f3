//! Promoter CLI - converge a destination registry to a declared manifest
//!
//! This is the main entry point for the promoter command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.config.as_deref(), cli.verbose).await,
        Commands::Plan(args) => {
            commands::plan::run(args, cli.config.as_deref(), cli.verbose).await
        }
        Commands::Validate(args) => commands::validate::run(args),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            // Run milestones and the final verdict by default
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
