use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::OutputConfig;
use crate::engine::CodebaseIndex;

#[derive(Args)]
pub struct ClearArgs {
    /// Also disable indexing by removing the workspace configuration
    #[arg(long)]
    disable: bool,

    /// Workspace whose index to clear (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct ClearOutput {
    status: String,
}

pub async fn run(args: ClearArgs, output: OutputConfig) -> Result<()> {
    let workspace_root = args
        .path
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", args.path.display()))?;

    if !CodebaseIndex::is_enabled(&workspace_root) {
        bail!(
            "Spindle not initialized in {}. Nothing to clear.",
            workspace_root.display()
        );
    }

    let engine = CodebaseIndex::open(&workspace_root)
        .await
        .context("Failed to open index")?;
    engine.clear().await.context("Failed to clear index")?;
    drop(engine);

    if args.disable {
        let config_dir = crate::config::Config::config_dir(&workspace_root);
        std::fs::remove_dir_all(&config_dir)
            .with_context(|| format!("Failed to remove {}", config_dir.display()))?;
    }

    if output.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ClearOutput {
                status: if args.disable { "disabled" } else { "cleared" }.to_string()
            })?
        );
    } else if !output.quiet {
        if args.disable {
            println!(
                "{} Cleared index and disabled spindle for {}",
                "✓".green(),
                workspace_root.display()
            );
        } else {
            println!(
                "{} Cleared index for {}",
                "✓".green(),
                workspace_root.display()
            );
        }
    }

    Ok(())
}
