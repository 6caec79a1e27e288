//! Plan command handlers

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::*;
use mealplan_core::domain::slot::MealType;

use crate::config::Config;

/// Plan subcommands
#[derive(Subcommand)]
pub enum PlanCommands {
    /// Show the meals stored for a day
    Day {
        /// Date (YYYY-MM-DD)
        date: NaiveDate,
    },
}

pub async fn handle_plan_command(command: PlanCommands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        PlanCommands::Day { date } => {
            let Some(plan) = client.find_day_plan(date).await? else {
                println!("{}", format!("Nothing planned for {}.", date).yellow());
                return Ok(());
            };

            println!(
                "{}",
                format!("{} {}", plan.day.day_of_week, plan.day.date).bold()
            );

            for meal_type in MealType::ALL {
                let Some(stored) = plan.meal(meal_type) else {
                    println!("  {:<9} {}", meal_type.as_str().dimmed(), "-".dimmed());
                    continue;
                };

                let meal = &stored.meal;
                let prep = meal
                    .prep_minutes
                    .map(|m| format!(" ({} min)", m))
                    .unwrap_or_default();
                println!("  {:<9} {}{}", meal_type.as_str().cyan(), meal.name.bold(), prep);

                if let Some(description) = &meal.description {
                    println!("            {}", description.dimmed());
                }
                if !meal.ingredients.is_empty() {
                    let ingredients: Vec<String> = meal
                        .ingredients
                        .iter()
                        .map(|i| match &i.quantity {
                            Some(quantity) => format!("{} {}", quantity, i.name),
                            None => i.name.clone(),
                        })
                        .collect();
                    println!("            {}", ingredients.join(", "));
                }
            }

            Ok(())
        }
    }
}
