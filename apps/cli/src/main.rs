//! DealScout CLI: discover, enrich, and score acquisition targets.
//!
//! Drives the discovery, enrichment, and scoring jobs against a local
//! libSQL database. Ctrl-C asks the running job to stop at its next checkpoint.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
