//! Command-line interface for `deplabel`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::logging;

/// `deplabel` - keep the Jira dependency label in sync with core issue links.
#[derive(Parser, Debug)]
#[command(name = "deplabel")]
#[command(
    author,
    version,
    about = "Reconcile the canonical dependency label on Jira issues linked to a core scope",
    long_about = None,
    after_help = "Configuration comes from the environment, .env and deplabel.yaml (in that order)."
)]
pub struct Cli {
    /// Output format: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Dotenv file to read settings from [default: .env]
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// YAML config file to read settings from [default: deplabel.yaml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan label changes and preview or apply them
    Sync(SyncArgs),

    /// Resolve the core and labeled scopes without planning
    Scope,

    /// Show the resolved configuration (no secrets)
    Config,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["dry_run", "apply"])
))]
pub struct SyncArgs {
    /// Print planned changes without updating any issue
    #[arg(long)]
    pub dry_run: bool,

    /// Update labels and write an audit file
    #[arg(long)]
    pub apply: bool,

    /// Directory for audit files [default: JIRA_AUDIT_DIR or audit_logs]
    #[arg(long, value_name = "DIR")]
    pub audit_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    pub json: bool,
    pub verbose: u8,
    pub env_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl From<&Cli> for GlobalOpts {
    fn from(cli: &Cli) -> Self {
        Self {
            json: cli.json,
            verbose: cli.verbose,
            env_file: cli.env_file.clone(),
            config: cli.config.clone(),
        }
    }
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref(), cli.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let opts = GlobalOpts::from(&cli);
    match &cli.command {
        Commands::Sync(args) => commands::sync::execute(args, &opts),
        Commands::Scope => commands::scope::execute(&opts),
        Commands::Config => commands::config::execute(&opts),
        Commands::Completions(args) => {
            commands::completions::execute(args);
            Ok(())
        }
    }
}
