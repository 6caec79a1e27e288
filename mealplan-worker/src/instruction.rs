//! Model instructions
//!
//! Turns one day batch plus the job's constraints into the system and user
//! messages sent to the model.

use mealplan_core::domain::job::Constraints;
use std::fmt::Write;

use crate::service::batch::DayBatch;

const SYSTEM_PROMPT: &str = "You are a meal planning assistant. \
Answer with a single JSON object and nothing else. \
The object has one key, \"meals\", holding an array with exactly one entry per requested meal type. \
Each entry has: \"meal_type\" (one of breakfast, lunch, dinner, snack), \"name\", \"description\", \
\"ingredients\" (array of {\"name\", \"quantity\"}), \"steps\" (array of strings), \"prep_minutes\" (integer), \
and \"nutrition\" ({\"calories\", \"protein_g\", \"carbs_g\", \"fat_g\"} per serving).";

/// Messages for one model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub system: String,
    pub user: String,
}

impl Instruction {
    pub fn for_batch(batch: &DayBatch, constraints: &Constraints, avoid: &[String]) -> Self {
        let mut user = String::new();

        let meal_types: Vec<&str> = batch.meal_types.iter().map(|m| m.as_str()).collect();
        let _ = writeln!(
            user,
            "Plan {} for {} ({}).",
            meal_types.join(", "),
            batch.date.format("%A"),
            batch.date
        );

        if !constraints.dietary.is_empty() {
            let _ = writeln!(user, "Dietary requirements: {}.", constraints.dietary.join(", "));
        }
        if !constraints.available_ingredients.is_empty() {
            let _ = writeln!(
                user,
                "Prefer these available ingredients: {}.",
                constraints.available_ingredients.join(", ")
            );
        }
        if let Some(minutes) = constraints.max_prep_minutes {
            let _ = writeln!(user, "Each meal must take at most {} minutes to prepare.", minutes);
        }
        if let Some(servings) = constraints.servings {
            let _ = writeln!(user, "Quantities are for {} servings.", servings);
        }
        if let Some(note) = constraints.note.as_deref().filter(|n| !n.trim().is_empty()) {
            let _ = writeln!(user, "Note from the user: {}", note.trim());
        }
        for (key, value) in &constraints.extra {
            let _ = writeln!(user, "{}: {}", key, value);
        }

        if !avoid.is_empty() {
            let _ = writeln!(
                user,
                "These meals are being replaced, suggest something different: {}.",
                avoid.join(", ")
            );
        }

        Self {
            system: SYSTEM_PROMPT.to_string(),
            user: user.trim_end().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mealplan_core::domain::slot::MealType;

    fn batch() -> DayBatch {
        DayBatch {
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            meal_types: vec![MealType::Lunch, MealType::Dinner],
        }
    }

    #[test]
    fn test_instruction_names_slots_and_constraints() {
        let constraints = Constraints {
            dietary: vec!["vegetarian".to_string()],
            max_prep_minutes: Some(30),
            ..Default::default()
        };

        let instruction = Instruction::for_batch(&batch(), &constraints, &[]);

        assert!(instruction.user.starts_with("Plan lunch, dinner for Monday (2025-06-02)."));
        assert!(instruction.user.contains("Dietary requirements: vegetarian."));
        assert!(instruction.user.contains("at most 30 minutes"));
        assert!(!instruction.user.contains("replaced"));
        assert!(instruction.system.contains("\"meals\""));
    }

    #[test]
    fn test_instruction_lists_meals_to_avoid() {
        let avoid = vec!["Lentil soup".to_string(), "Pad thai".to_string()];
        let instruction = Instruction::for_batch(&batch(), &Constraints::default(), &avoid);

        assert!(instruction.user.ends_with("suggest something different: Lentil soup, Pad thai."));
    }
}
