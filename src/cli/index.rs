use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use super::OutputConfig;
use crate::engine::CodebaseIndex;
use crate::types::IndexStatus;

#[derive(Args)]
pub struct IndexArgs {
    /// Discard the existing index and rebuild from scratch
    #[arg(long)]
    force: bool,

    /// Workspace to index (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct IndexOutput {
    status: String,
    files_indexed: usize,
    files_unchanged: usize,
    files_deleted: usize,
    files_failed: usize,
    total_files: u64,
    total_symbols: u64,
    elapsed_ms: u128,
}

pub async fn run(args: IndexArgs, output: OutputConfig) -> Result<()> {
    let start = Instant::now();
    let workspace_root = args
        .path
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", args.path.display()))?;

    if !CodebaseIndex::is_enabled(&workspace_root) {
        bail!(
            "Spindle not initialized in {}. Run `spindle init` first.",
            workspace_root.display()
        );
    }

    let engine = Arc::new(
        CodebaseIndex::open(&workspace_root)
            .await
            .context("Failed to open index")?,
    );

    if args.force {
        engine.clear().await.context("Failed to clear index")?;
    }

    // Refresh in a task so the progress counters can be polled
    let run = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.refresh().await })
    };

    let progress_bar = if !output.quiet && !output.json {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
                .expect("progress template is valid")
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    loop {
        if run.is_finished() {
            break;
        }
        if let Some(pb) = &progress_bar {
            if let Ok(stats) = engine.stats() {
                if stats.status == IndexStatus::Indexing && stats.progress.total > 0 {
                    pb.set_length(stats.progress.total);
                    pb.set_position(stats.progress.completed);
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if let Some(pb) = &progress_bar {
        pb.finish_and_clear();
    }

    let summary = run.await?.context("Indexing failed")?;
    let stats = engine.stats()?;
    let elapsed = start.elapsed();

    if output.json {
        let json_output = IndexOutput {
            status: stats.status.to_string(),
            files_indexed: summary.indexed,
            files_unchanged: summary.unchanged,
            files_deleted: summary.deleted,
            files_failed: summary.failed.len(),
            total_files: stats.files_count,
            total_symbols: stats.symbols_count,
            elapsed_ms: elapsed.as_millis(),
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        if summary.indexed == 0 && summary.deleted == 0 && summary.failed.is_empty() {
            println!("{} Index is up to date", "✓".green());
        } else {
            println!(
                "{} Indexed {} files ({} symbols) in {:.2}s",
                "✓".green(),
                summary.indexed,
                stats.symbols_count,
                elapsed.as_secs_f64()
            );
            if summary.deleted > 0 {
                println!("  Purged {} deleted files", summary.deleted);
            }
        }

        if !summary.failed.is_empty() {
            println!(
                "\n{} {} files skipped:",
                "!".yellow(),
                summary.failed.len()
            );
            for (path, error) in summary.failed.iter().take(5) {
                println!("  {path}: {error}");
            }
            if summary.failed.len() > 5 {
                println!("  ... and {} more", summary.failed.len() - 5);
            }
        }

        if output.verbose {
            println!("\nIndex statistics:");
            println!("  Total files:   {}", stats.files_count);
            println!("  Total symbols: {}", stats.symbols_count);
            for lang in &stats.languages {
                println!(
                    "  {}: {} files, {} symbols",
                    lang.language, lang.file_count, lang.symbol_count
                );
            }
        }
    }

    Ok(())
}
