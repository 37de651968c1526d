use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::OutputConfig;
use crate::engine::CodebaseIndex;

#[derive(Args)]
pub struct WatchArgs {
    /// Quiet period after the last change before reindexing, in milliseconds
    #[arg(long, default_value = "500")]
    debounce_ms: u64,

    /// Workspace to watch (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

pub async fn run(args: WatchArgs, output: OutputConfig) -> Result<()> {
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

    // Bring the index up to date before watching
    let summary = engine.refresh().await.context("Initial refresh failed")?;
    if !output.quiet && !output.json {
        println!(
            "{} Watching {} ({} files indexed)",
            "✓".green(),
            workspace_root.display(),
            engine.stats()?.files_count
        );
        if !summary.failed.is_empty() {
            println!("  {} files skipped on initial pass", summary.failed.len());
        }
        println!("  Press Ctrl-C to stop.");
    }

    let (tx, rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |event| {
            let _ = tx.send(event);
        },
        notify::Config::default(),
    )
    .context("Failed to create filesystem watcher")?;
    watcher
        .watch(&workspace_root, RecursiveMode::Recursive)
        .context("Failed to watch workspace")?;

    let debounce = Duration::from_millis(args.debounce_ms);
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut dirty = false;
        while let Ok(event) = rx.try_recv() {
            if let Ok(event) = event {
                if event_is_relevant(&event, &workspace_root) {
                    dirty = true;
                }
            }
        }
        if !dirty {
            continue;
        }

        // Let a burst of changes settle before reindexing
        tokio::time::sleep(debounce).await;
        while rx.try_recv().is_ok() {}

        match engine.refresh().await {
            Ok(summary) => {
                if summary.coalesced {
                    continue;
                }
                if (summary.indexed > 0 || summary.deleted > 0) && !output.quiet && !output.json {
                    println!(
                        "{} Reindexed {} files, purged {}",
                        "↻".cyan(),
                        summary.indexed,
                        summary.deleted
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "refresh failed");
                if !output.quiet && !output.json {
                    println!("{} Refresh failed: {e}", "!".red());
                }
            }
        }
    }
}

/// Ignore events for spindle's own configuration directory
fn event_is_relevant(event: &notify::Event, workspace_root: &std::path::Path) -> bool {
    let config_dir = workspace_root.join(".spindle");
    event
        .paths
        .iter()
        .any(|path| !path.starts_with(&config_dir))
}
