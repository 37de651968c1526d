use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::OutputConfig;
use crate::engine::CodebaseIndex;
use crate::types::{IndexStatus, SearchHit};

#[derive(Args)]
pub struct SearchArgs {
    /// Natural-language query
    query: String,

    /// Restrict results to these workspace-relative directories
    #[arg(long = "dir", short = 'd')]
    dirs: Vec<String>,

    /// Maximum number of results
    #[arg(long, short = 'k')]
    limit: Option<usize>,

    /// Workspace to search (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct SearchOutput {
    status: String,
    query: String,
    hits: Vec<SearchHit>,
}

pub async fn run(args: SearchArgs, output: OutputConfig) -> Result<()> {
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

    let hits = engine
        .search(&args.query, &args.dirs, args.limit)
        .await
        .context("Search failed")?;
    let stats = engine.stats()?;

    // "not indexed yet" and "no matches" are different answers
    let status = if stats.status == IndexStatus::Completed {
        "ok"
    } else {
        "index_incomplete"
    };

    if output.json {
        let json_output = SearchOutput {
            status: status.to_string(),
            query: args.query,
            hits,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
        return Ok(());
    }

    if stats.status != IndexStatus::Completed && !output.quiet {
        println!(
            "{} Index is {} — results may be incomplete. Run `spindle index`.",
            "!".yellow(),
            stats.status
        );
    }

    if hits.is_empty() {
        if !output.quiet {
            println!("No matches for '{}'", args.query);
        }
        return Ok(());
    }

    for hit in &hits {
        let symbol = &hit.symbol;
        println!(
            "{} {}:{}  {} {}  {}",
            format!("{:.3}", hit.score).cyan(),
            symbol.file_path.green(),
            symbol.start_line,
            symbol.kind.to_string().blue(),
            symbol.name.bold(),
            symbol
                .scope
                .as_deref()
                .map(|s| format!("(in {s})"))
                .unwrap_or_default()
                .dimmed(),
        );
        if output.verbose {
            for line in symbol.snippet.lines().take(6) {
                println!("    {line}");
            }
            println!();
        }
    }

    Ok(())
}
