use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::OutputConfig;
use crate::engine::{CodebaseIndex, SettingsUpdate};

#[derive(Args)]
pub struct SettingsArgs {
    /// Replace the exclude patterns (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Whether test files are indexed
    #[arg(long)]
    include_tests: Option<bool>,

    /// Refresh the index automatically when the engine opens
    #[arg(long)]
    auto_index: Option<bool>,

    /// Workspace to configure (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Serialize)]
struct SettingsOutput {
    status: String,
    exclude_paths: Vec<String>,
    include_tests: bool,
    auto_index_on_startup: bool,
}

pub async fn run(args: SettingsArgs, output: OutputConfig) -> Result<()> {
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

    let engine = CodebaseIndex::open(&workspace_root)
        .await
        .context("Failed to open index")?;

    let changed =
        !args.exclude.is_empty() || args.include_tests.is_some() || args.auto_index.is_some();

    let config = if changed {
        engine
            .update_settings(SettingsUpdate {
                exclude_paths: if args.exclude.is_empty() {
                    None
                } else {
                    Some(args.exclude)
                },
                include_tests: args.include_tests,
                auto_index_on_startup: args.auto_index,
            })
            .context("Failed to update settings")?
    } else {
        engine.config()
    };

    if output.json {
        let json_output = SettingsOutput {
            status: if changed { "updated" } else { "unchanged" }.to_string(),
            exclude_paths: config.index.exclude_paths,
            include_tests: config.index.include_tests,
            auto_index_on_startup: config.index.auto_index_on_startup,
        };
        println!("{}", serde_json::to_string_pretty(&json_output)?);
    } else if !output.quiet {
        if changed {
            println!("{} Settings updated", "✓".green());
            println!("  Run `spindle index` to apply them to the index.");
        }
        println!("  include_tests: {}", config.index.include_tests);
        println!(
            "  auto_index_on_startup: {}",
            config.index.auto_index_on_startup
        );
        println!("  exclude_paths:");
        for pattern in &config.index.exclude_paths {
            println!("    {pattern}");
        }
    }

    Ok(())
}
