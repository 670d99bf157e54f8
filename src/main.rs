mod commands;
mod fetch;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "icsync")]
#[command(about = "Mirror a published ICS feed into a Google calendar")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feed and apply the minimal set of calendar mutations
    Sync,
    /// Show what a sync would change, without writing anything
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Settings come from the environment; a local .env file fills the gaps.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync => commands::sync::run().await,
        Commands::Status => commands::status::run().await,
    }
}
