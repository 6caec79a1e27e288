//! Mealplan CLI
//!
//! Command-line interface for submitting and following generation jobs.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mealplan")]
#[command(about = "Mealplan generation CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(
        long,
        env = "MEALPLAN_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    /// Owner the requests act for
    #[arg(long, env = "MEALPLAN_OWNER_ID")]
    owner: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
        owner: cli.owner,
    };

    handle_command(cli.command, &config).await
}
