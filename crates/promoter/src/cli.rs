//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Promoter - converge a destination registry to a declared manifest
#[derive(Parser, Debug)]
#[command(name = "promoter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to promoter.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the manifest against the inventory and execute the requests
    Run(RunArgs),

    /// Show the ordered requests a run would execute
    Plan(PlanArgs),

    /// Check a manifest for consistency errors
    Validate(ValidateArgs),
}

/// Inputs shared by run and plan
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Manifest describing the desired destination state
    #[arg(short, long)]
    pub manifest: Utf8PathBuf,

    /// Inventory snapshot (registry -> image -> digest -> tags)
    #[arg(short, long)]
    pub inventory: Utf8PathBuf,

    /// Delete destination tags the manifest does not declare
    #[arg(long)]
    pub delete_extra_tags: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of concurrent workers (overrides config and PROMOTER_THREADS)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Record the requests without executing them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Apply the plan to an in-memory copy of the destination and print it
    #[arg(long)]
    pub simulate: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Manifest to check
    #[arg(short, long)]
    pub manifest: Utf8PathBuf,

    /// Also check every registry of an inventory snapshot
    #[arg(short, long)]
    pub inventory: Option<Utf8PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "promoter",
            "-vv",
            "run",
            "--manifest",
            "manifest.yaml",
            "--inventory",
            "inventory.yaml",
            "--threads",
            "4",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.source.manifest, Utf8PathBuf::from("manifest.yaml"));
                assert_eq!(args.threads, Some(4));
                assert!(args.dry_run);
                assert!(!args.source.delete_extra_tags);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_plan_with_global_config() {
        let cli = Cli::try_parse_from([
            "promoter",
            "plan",
            "-m",
            "manifest.yaml",
            "-i",
            "inventory.yaml",
            "--delete-extra-tags",
            "--json",
            "--config",
            "promoter.yaml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(Utf8PathBuf::from("promoter.yaml")));
        match cli.command {
            Commands::Plan(args) => {
                assert!(args.json);
                assert!(!args.simulate);
                assert!(args.source.delete_extra_tags);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_inventory() {
        assert!(Cli::try_parse_from(["promoter", "run", "--manifest", "m.yaml"]).is_err());
    }
}
