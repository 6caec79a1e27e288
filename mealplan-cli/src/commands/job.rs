//! Job command handlers
//!
//! Handles submitting generation jobs, listing active ones, and following
//! a job until it finishes.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Subcommand;
use colored::*;
use mealplan_client::{JobOutcome, JobWatcher, OrchestratorClient};
use mealplan_core::domain::job::{Constraints, Job, JobMode, JobTarget};
use mealplan_core::domain::slot::{MealType, SlotRef, default_meal_types};
use mealplan_core::dto::job::{JobUpdate, PendingQuery, SubmitJob};

use super::colorize_status;
use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::types::{IdOrPrefix, SlotArg};

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Submit a generation job
    Submit {
        /// single, weekly, regenerate or multi-slot
        #[arg(long)]
        mode: JobMode,

        /// Slot or day date; first day for weekly jobs
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Meal types (comma-separated)
        #[arg(long = "meal", value_delimiter = ',')]
        meals: Vec<MealType>,

        /// DATE:MEAL slot for multi-slot jobs, repeatable
        #[arg(long = "slot")]
        slots: Vec<SlotArg>,

        /// Dietary requirements (comma-separated)
        #[arg(long = "diet", value_delimiter = ',')]
        dietary: Vec<String>,

        /// Ingredients to use up (comma-separated)
        #[arg(long = "ingredient", value_delimiter = ',')]
        ingredients: Vec<String>,

        /// Maximum preparation time per meal, in minutes
        #[arg(long)]
        max_prep: Option<u32>,

        #[arg(long)]
        servings: Option<u32>,

        /// Free-form note passed to the model
        #[arg(long)]
        note: Option<String>,

        /// Follow the job until it finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// List active jobs (stale ones are reclaimed by this call)
    Pending {
        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,

        #[arg(long)]
        mode: Option<JobMode>,
    },
    /// Get job details
    Get {
        /// Job ID, or unambiguous prefix of an active job
        id: String,
    },
    /// Follow a job until it finishes
    Watch {
        /// Job ID, or unambiguous prefix of an active job
        id: String,
    },
}

/// Routes job subcommands to their respective handlers
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        JobCommands::Submit {
            mode,
            date,
            meals,
            slots,
            dietary,
            ingredients,
            max_prep,
            servings,
            note,
            watch,
        } => {
            let target = build_target(mode, date, meals, slots)?;
            let constraints = Constraints {
                dietary,
                available_ingredients: ingredients,
                max_prep_minutes: max_prep,
                servings,
                note,
                ..Default::default()
            };
            submit_job(client, mode, target, constraints, watch).await
        }
        JobCommands::Pending { from, to, mode } => {
            list_pending(&client, PendingQuery { from, to, mode }).await
        }
        JobCommands::Get { id } => get_job(&client, &id).await,
        JobCommands::Watch { id } => {
            let job_id = resolve_job_id(&client, &IdOrPrefix::parse(&id)).await?;
            watch_job(client, job_id).await
        }
    }
}

/// Builds the target shape each mode expects from the command line
fn build_target(
    mode: JobMode,
    date: Option<NaiveDate>,
    meals: Vec<MealType>,
    slots: Vec<SlotArg>,
) -> Result<JobTarget> {
    let target = match mode {
        JobMode::MultiSlot => {
            if slots.is_empty() {
                bail!("multi-slot jobs need at least one --slot DATE:MEAL");
            }
            JobTarget::Slots {
                slots: slots.into_iter().map(SlotRef::from).collect(),
            }
        }
        JobMode::Single => {
            let date = date.context("single jobs need --date")?;
            match meals.as_slice() {
                [meal_type] => JobTarget::Slot(SlotRef::new(date, *meal_type)),
                _ => bail!("single jobs need exactly one --meal"),
            }
        }
        JobMode::Regenerate => {
            let date = date.context("regenerate jobs need --date")?;
            match meals.as_slice() {
                [meal_type] => JobTarget::Slot(SlotRef::new(date, *meal_type)),
                _ => JobTarget::Day {
                    date,
                    meal_types: or_default(meals),
                },
            }
        }
        JobMode::Weekly => JobTarget::Week {
            start_date: date.context("weekly jobs need --date for the first day")?,
            meal_types: or_default(meals),
        },
    };

    target.validate_for(mode)?;
    Ok(target)
}

fn or_default(meals: Vec<MealType>) -> Vec<MealType> {
    if meals.is_empty() {
        default_meal_types()
    } else {
        meals
    }
}

async fn submit_job(
    client: OrchestratorClient,
    mode: JobMode,
    target: JobTarget,
    constraints: Constraints,
    watch: bool,
) -> Result<()> {
    let accepted = client
        .submit_job(SubmitJob {
            mode,
            target,
            constraints,
        })
        .await
        .context("Failed to submit job")?;

    println!(
        "{} Submitted {} job {}",
        "✓".green(),
        mode,
        accepted.job_id.to_string().cyan()
    );
    if let Some(existing) = accepted.duplicate_of {
        println!(
            "{}",
            format!("  ⚠ Overlaps active job {}", existing).yellow()
        );
    }

    if watch {
        println!();
        watch_job(client, accepted.job_id).await?;
    }

    Ok(())
}

async fn list_pending(client: &OrchestratorClient, query: PendingQuery) -> Result<()> {
    let pending = client.list_pending(&query).await?;

    if !pending.reclaimed.is_empty() {
        println!(
            "{}",
            format!(
                "Reclaimed {} stale job(s): {}",
                pending.reclaimed.len(),
                pending
                    .reclaimed
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
            .yellow()
        );
        println!();
    }

    if pending.active.is_empty() {
        println!("{}", "No active jobs.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} active job(s):", pending.active.len()).bold()
        );
        println!();
        for job in &pending.active {
            print_job_summary(job);
        }
    }

    Ok(())
}

async fn get_job(client: &OrchestratorClient, id: &str) -> Result<()> {
    let job_id = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.get_job(job_id).await?;

    print_job_details(&job);

    Ok(())
}

async fn watch_job(client: OrchestratorClient, job_id: uuid::Uuid) -> Result<()> {
    println!("{}", format!("Following job {}", job_id).bold());

    let outcome = JobWatcher::new(client)
        .watch(job_id, print_update)
        .await
        .context("Lost track of the job")?;

    match outcome {
        JobOutcome::Completed(result) => {
            println!(
                "{} Generated {} meal(s)",
                "✓".green(),
                result.meals.len()
            );
            for generated in &result.meals {
                println!(
                    "  {} {:<9} {}",
                    generated.date.to_string().dimmed(),
                    generated.meal_type.as_str().cyan(),
                    generated.meal.name
                );
            }
            Ok(())
        }
        JobOutcome::Failed(message) => {
            println!("{} {}", "✗".red(), message.red());
            bail!("job {} failed", job_id)
        }
    }
}

fn print_update(update: &JobUpdate) {
    let progress = update
        .progress
        .as_ref()
        .map(|p| format!(" {}/{}", p.done, p.total))
        .unwrap_or_default();
    let message = update
        .progress
        .as_ref()
        .and_then(|p| p.message.as_deref())
        .map(|m| format!(" {}", m.dimmed()))
        .unwrap_or_default();

    println!(
        "  {} {}{}{}",
        update.updated_at.format("%H:%M:%S").to_string().dimmed(),
        colorize_status(update.status),
        progress,
        message
    );
}

fn describe_target(target: &JobTarget) -> String {
    let meal_list = |meal_types: &[MealType]| {
        meal_types
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    match target {
        JobTarget::Slot(slot) => format!("{} {}", slot.date, slot.meal_type),
        JobTarget::Day { date, meal_types } => format!("{} ({})", date, meal_list(meal_types)),
        JobTarget::Week {
            start_date,
            meal_types,
        } => format!("week of {} ({})", start_date, meal_list(meal_types)),
        JobTarget::Slots { slots } => format!("{} slot(s)", slots.len()),
    }
}

/// Print a job summary
fn print_job_summary(job: &Job) {
    println!("  {} Job {}", "▸".cyan(), job.id.to_string().dimmed());
    println!("    Mode:     {}", job.mode);
    println!("    Target:   {}", describe_target(&job.target));
    println!("    Status:   {}", colorize_status(job.status));
    if let Some(progress) = &job.progress {
        println!("    Progress: {}/{}", progress.done, progress.total);
    }
    println!(
        "    Updated:  {}",
        job.updated_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:        {}", job.id.to_string().cyan());
    println!("  Mode:      {}", job.mode);
    println!("  Target:    {}", describe_target(&job.target));
    println!("  Status:    {}", colorize_status(job.status));
    println!("  Created:   {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:   {}", job.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(progress) = &job.progress {
        println!("  Progress:  {}/{}", progress.done, progress.total);
    }

    if let JobTarget::Slots { slots } = &job.target {
        println!("\n{}", "Slots:".bold());
        for slot in slots {
            println!("  {} {}", slot.date, slot.meal_type.as_str().cyan());
        }
    }

    if job.constraints != Constraints::default() {
        println!("\n{}", "Constraints:".bold());
        if let Ok(pretty) = serde_json::to_string_pretty(&job.constraints) {
            println!("{}", pretty);
        }
    }

    if let Some(result) = &job.result {
        println!("\n{}", "Meals:".bold());
        for generated in &result.meals {
            println!(
                "  {} {:<9} {}",
                generated.date,
                generated.meal_type.as_str().cyan(),
                generated.meal.name
            );
        }
    }

    if let Some(error) = &job.error_message {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[test]
    fn test_single_needs_exactly_one_meal() {
        let target = build_target(JobMode::Single, Some(date()), vec![MealType::Dinner], vec![])
            .unwrap();
        assert_eq!(target, JobTarget::Slot(SlotRef::new(date(), MealType::Dinner)));

        assert!(build_target(JobMode::Single, Some(date()), vec![], vec![]).is_err());
        assert!(build_target(JobMode::Single, None, vec![MealType::Dinner], vec![]).is_err());
    }

    #[test]
    fn test_regenerate_day_defaults_meal_types() {
        let target = build_target(JobMode::Regenerate, Some(date()), vec![], vec![]).unwrap();
        assert_eq!(
            target,
            JobTarget::Day {
                date: date(),
                meal_types: default_meal_types(),
            }
        );
    }

    #[test]
    fn test_multi_slot_rejects_duplicates() {
        let slot = SlotArg {
            date: date(),
            meal_type: MealType::Lunch,
        };
        assert!(build_target(JobMode::MultiSlot, None, vec![], vec![slot.clone(), slot]).is_err());
        assert!(build_target(JobMode::MultiSlot, None, vec![], vec![]).is_err());
    }
}
