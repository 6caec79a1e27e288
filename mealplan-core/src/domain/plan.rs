//! Plan container types
//!
//! Weeks and days are lazily created grouping records. Meals are the
//! generated content stored in a day, one per meal type.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::slot::{MealType, week_end, week_start};

/// A Monday-to-Sunday week of an owner's plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub id: Uuid,
    pub owner: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Week {
    /// Creates the week containing `date`, if that week is representable
    pub fn containing(owner: Uuid, date: NaiveDate, now: DateTime<Utc>) -> Option<Self> {
        Some(Self {
            id: Uuid::new_v4(),
            owner,
            start_date: week_start(date)?,
            end_date: week_end(date)?,
            created_at: now,
        })
    }
}

/// A single date of an owner's plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub id: Uuid,
    pub owner: Uuid,
    pub week_id: Uuid,
    pub date: NaiveDate,
    pub day_of_week: Weekday,
    pub created_at: DateTime<Utc>,
}

impl Day {
    pub fn new(owner: Uuid, week_id: Uuid, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            week_id,
            date,
            day_of_week: date.weekday(),
            created_at: now,
        }
    }
}

/// Generated meal content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
}

/// Per-serving nutrition estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f32,
    #[serde(default)]
    pub protein_g: f32,
    #[serde(default)]
    pub carbs_g: f32,
    #[serde(default)]
    pub fat_g: f32,
}

/// A meal persisted in a day container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMeal {
    pub id: Uuid,
    pub day_id: Uuid,
    pub meal_type: MealType,
    pub meal: Meal,
    /// Job that last wrote this slot
    pub job_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

/// A day container together with its meals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: Day,
    pub meals: Vec<StoredMeal>,
}

impl DayPlan {
    pub fn meal(&self, meal_type: MealType) -> Option<&StoredMeal> {
        self.meals.iter().find(|m| m.meal_type == meal_type)
    }
}
