//! MixCut CLI: batch-render marketing clips from a project's scripts.
//!
//! Usage:
//!   mixcut init                    Write a default config file
//!   mixcut import <FILE>           Import a project document
//!   mixcut generate <PROJECT_ID>   Render the project's selected scripts
//!   mixcut status <TASK_ID>        Show one task
//!   mixcut cancel <TASK_ID>        Cancel a pending or processing task
//!   mixcut tasks                   List tasks, newest first
//!   mixcut sweep                   Remove stale scratch files once
//!   mixcut check                   Check ffmpeg, storage, and directories

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mixcut_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "mixcut",
    about = "Batch generation of short marketing videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/mixcut/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Import a project document (JSON) into the project store
    Import {
        /// Path to the project JSON file
        path: PathBuf,
    },

    /// Generate clips for a project and wait for the task to finish
    Generate {
        /// Project identifier
        project_id: String,
    },

    /// Show a task
    Status {
        /// Task identifier
        task_id: String,

        /// Print the task document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cancel a pending or processing task
    Cancel {
        /// Task identifier
        task_id: String,
    },

    /// List tasks, newest first
    Tasks {
        /// Only tasks in this status: pending|processing|completed|failed
        #[arg(long)]
        status: Option<String>,

        /// Only tasks of this project
        #[arg(long)]
        project: Option<String>,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: usize,

        /// Tasks per page
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Remove stale files from the scratch directory once
    Sweep {
        /// Override the configured maximum age (seconds)
        #[arg(long)]
        max_age_secs: Option<u64>,
    },

    /// Check ffmpeg, storage, and directories
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    mixcut_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Init { force } => commands::init::run(&config, cli.config, force),
        Commands::Import { path } => commands::import::run(&config, path).await,
        Commands::Generate { project_id } => commands::generate::run(&config, project_id).await,
        Commands::Status { task_id, json } => commands::status::run(&config, task_id, json).await,
        Commands::Cancel { task_id } => commands::cancel::run(&config, task_id).await,
        Commands::Tasks {
            status,
            project,
            page,
            limit,
        } => commands::tasks::run(&config, status, project, page, limit).await,
        Commands::Sweep { max_age_secs } => commands::sweep::run(&config, max_age_secs).await,
        Commands::Check => commands::check::run(&config).await,
    }
}
