//! Tablepipe CLI - run and inspect the CSV to search index workflow.

mod commands;
mod progress;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tablepipe - load, extract, clean and publish tabular data
#[derive(Parser)]
#[command(name = "tablepipe")]
#[command(version)]
#[command(about = "Load a CSV into a table, clean it, and publish it to a search index", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(short, long, global = true, env = "TABLEPIPE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize tablepipe (create config, data directory and database)
    Init,

    /// Run the whole workflow
    Run {
        /// Make a single attempt even if retries are configured
        #[arg(long)]
        no_retry: bool,

        /// Start at this stage (ingest, extract, clean, publish)
        #[arg(long, default_value = "ingest")]
        from: String,
    },

    /// Run one stage on its own
    Stage {
        /// Stage name (ingest, extract, clean, publish)
        name: String,

        /// Publish into a throwaway in-memory index instead of the endpoint
        #[arg(long)]
        dry_run: bool,
    },

    /// Show table, artifact, index and run status
    Status,

    /// List recent runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Show the schedule an external scheduler should register
    Schedule,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., search.index)
        key: String,

        /// Value to set
        value: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tablepipe=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tablepipe=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init => commands::init::run(config),
        Commands::Run { no_retry, from } => commands::run::run(config, no_retry, &from),
        Commands::Stage { name, dry_run } => commands::stage::run(config, &name, dry_run),
        Commands::Status => commands::status::run(config),
        Commands::Runs { limit } => commands::runs::run(config, limit),
        Commands::Schedule => commands::schedule::run(config),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(config),
            ConfigCommands::Path => commands::config::path(config),
            ConfigCommands::Set { key, value } => commands::config::set(config, &key, &value),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
