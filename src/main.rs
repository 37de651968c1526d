use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod embed;
mod engine;
mod error;
mod extract;
mod grammar;
mod orchestrator;
mod search;
mod store;
mod types;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    cli.run().await
}
