use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::OutputConfig;
use crate::config::Config;
use crate::engine::CodebaseIndex;

#[derive(Args)]
pub struct InitArgs {
    /// Workspace to enable indexing for (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct InitOutput {
    status: String,
    config_path: String,
}

pub async fn run(args: InitArgs, output: OutputConfig) -> Result<()> {
    let workspace_root = args
        .path
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", args.path.display()))?;

    let already = CodebaseIndex::is_enabled(&workspace_root);
    CodebaseIndex::enable(&workspace_root).context("Failed to write configuration")?;
    let config_path = Config::config_path(&workspace_root);

    if output.json {
        let json_output = InitOutput {
            status: if already { "already_initialized" } else { "initialized" }.to_string(),
            config_path: config_path.display().to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        if already {
            println!(
                "{} Spindle already initialized ({})",
                "✓".green(),
                config_path.display()
            );
        } else {
            println!(
                "{} Initialized spindle in {}",
                "✓".green(),
                workspace_root.display()
            );
            println!("  Config: {}", config_path.display());
            println!("  Run `spindle index` to build the index.");
        }
    }

    Ok(())
}
