mod clear;
mod index;
mod init;
mod search;
mod settings;
mod status;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "spindle")]
#[command(about = "Codebase indexing and semantic search engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Show detailed progress
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Enable indexing for a workspace
    Init(init::InitArgs),

    /// Build or incrementally refresh the index
    Index(index::IndexArgs),

    /// Semantic search over indexed symbols
    Search(search::SearchArgs),

    /// Show index status and statistics
    Status(status::StatusArgs),

    /// Remove all indexed data for a workspace
    Clear(clear::ClearArgs),

    /// Show or update indexing settings
    Settings(settings::SettingsArgs),

    /// Watch the workspace and refresh the index on changes
    Watch(watch::WatchArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let output = OutputConfig {
            json: self.json,
            quiet: self.quiet,
            verbose: self.verbose,
        };

        match self.command {
            Commands::Init(args) => init::run(args, output).await,
            Commands::Index(args) => index::run(args, output).await,
            Commands::Search(args) => search::run(args, output).await,
            Commands::Status(args) => status::run(args, output).await,
            Commands::Clear(args) => clear::run(args, output).await,
            Commands::Settings(args) => settings::run(args, output).await,
            Commands::Watch(args) => watch::run(args, output).await,
        }
    }
}

/// Output configuration passed to all commands
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}
