use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::OutputConfig;
use crate::engine::CodebaseIndex;
use crate::types::{IndexStats, IndexStatus};

#[derive(Args)]
pub struct StatusArgs {
    /// Show per-language statistics
    #[arg(long)]
    detailed: bool,

    /// Workspace to inspect (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct StatusOutput {
    status: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<IndexStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_summary: Option<String>,
}

pub async fn run(args: StatusArgs, output: OutputConfig) -> Result<()> {
    let workspace_root = args
        .path
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", args.path.display()))?;

    if !CodebaseIndex::is_enabled(&workspace_root) {
        if output.json {
            let json_output = StatusOutput {
                status: "not_initialized".to_string(),
                path: workspace_root.display().to_string(),
                stats: None,
                failed_summary: None,
            };
            println!("{}", serde_json::to_string_pretty(&json_output)?);
        } else if !output.quiet {
            println!(
                "{} Spindle not initialized in {}",
                "!".yellow(),
                workspace_root.display()
            );
            println!("Run `spindle init` to initialize.");
        }
        return Ok(());
    }

    let engine = CodebaseIndex::open(&workspace_root)
        .await
        .context("Failed to open index")?;
    let stats = engine.stats()?;
    let failed_summary = engine.failed_summary()?.filter(|s| !s.is_empty());

    if output.json {
        let json_output = StatusOutput {
            status: stats.status.to_string(),
            path: workspace_root.display().to_string(),
            stats: Some(stats),
            failed_summary,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
        return Ok(());
    }

    if output.quiet {
        return Ok(());
    }

    println!(
        "{} Spindle status for {}",
        "✓".green(),
        workspace_root.display()
    );
    println!();
    println!("  Status:       {}", colorize_status(stats.status));
    println!("  Files:        {}", stats.files_count.to_string().cyan());
    println!("  Symbols:      {}", stats.symbols_count.to_string().cyan());

    if stats.status == IndexStatus::Indexing || stats.status == IndexStatus::Scanning {
        println!(
            "  Progress:     {}/{}",
            stats.progress.completed, stats.progress.total
        );
    }

    if let Some(ts) = stats.last_indexed {
        let dt = chrono::DateTime::from_timestamp(ts, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "Unknown".to_string());
        println!("  Last indexed: {dt}");
    }

    if stats.failed_files > 0 {
        println!(
            "  Failed files: {}",
            stats.failed_files.to_string().yellow()
        );
        if let Some(summary) = failed_summary {
            println!("                {summary}");
        }
    }

    if args.detailed {
        println!("\n  Languages:");
        for lang in &stats.languages {
            println!(
                "    {}: {} files, {} symbols",
                lang.language.blue(),
                lang.file_count,
                lang.symbol_count
            );
        }
    }

    Ok(())
}

fn colorize_status(status: IndexStatus) -> String {
    match status {
        IndexStatus::Completed => status.to_string().green().to_string(),
        IndexStatus::Error => status.to_string().red().to_string(),
        IndexStatus::Idle => status.to_string().dimmed().to_string(),
        _ => status.to_string().yellow().to_string(),
    }
}
