//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod plan;

pub use job::JobCommands;
pub use plan::PlanCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use mealplan_core::domain::job::JobStatus;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generation jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Stored meal plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Plan { command } => plan::handle_plan_command(command, config).await,
    }
}

/// Colorize job status for display
pub(crate) fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Processing => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}
