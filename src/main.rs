// Atelier - no-code builder for AI assistants
// Main entry point

use anyhow::Result;
use clap::Parser;

use atelier::cli::{self, Cli};
use atelier::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    cli::run(cli, config).await
}
