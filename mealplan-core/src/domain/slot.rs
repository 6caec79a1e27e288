//! Slot domain types
//!
//! A slot is one `(date, meal_type)` cell of a meal plan.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Meal of the day a slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown meal type: {0}")]
pub struct UnknownMealType(pub String);

impl FromStr for MealType {
    type Err = UnknownMealType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => Err(UnknownMealType(other.to_string())),
        }
    }
}

/// Meal types a day or week target covers when the request names none
pub fn default_meal_types() -> Vec<MealType> {
    vec![MealType::Breakfast, MealType::Lunch, MealType::Dinner]
}

/// An addressable `(date, meal_type)` unit of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub meal_type: MealType,
}

impl Slot {
    pub fn new(date: NaiveDate, meal_type: MealType) -> Self {
        Self { date, meal_type }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.date, self.meal_type)
    }
}

/// A slot named by a job target
///
/// `existing_meal_id` points at the stored meal being replaced, when the
/// caller knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRef {
    pub date: NaiveDate,
    pub meal_type: MealType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_meal_id: Option<Uuid>,
}

impl SlotRef {
    pub fn new(date: NaiveDate, meal_type: MealType) -> Self {
        Self {
            date,
            meal_type,
            existing_meal_id: None,
        }
    }

    pub fn slot(&self) -> Slot {
        Slot::new(self.date, self.meal_type)
    }
}

/// Monday of the week containing `date`
///
/// `None` when that Monday falls before the earliest date chrono supports.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
}

/// Sunday of the week containing `date`, if representable
pub fn week_end(date: NaiveDate) -> Option<NaiveDate> {
    week_start(date)?.checked_add_days(Days::new(6))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_boundaries_are_monday_to_sunday() {
        // 2025-06-01 is a Sunday
        assert_eq!(week_start(date(2025, 6, 1)), Some(date(2025, 5, 26)));
        assert_eq!(week_end(date(2025, 6, 1)), Some(date(2025, 6, 1)));

        // Monday maps to itself
        assert_eq!(week_start(date(2025, 6, 2)), Some(date(2025, 6, 2)));
        assert_eq!(week_end(date(2025, 6, 2)), Some(date(2025, 6, 8)));
    }

    #[test]
    fn test_week_boundaries_cross_year() {
        // 2025-01-01 is a Wednesday
        assert_eq!(week_start(date(2025, 1, 1)), Some(date(2024, 12, 30)));
        assert_eq!(week_end(date(2025, 1, 1)), Some(date(2025, 1, 5)));
    }

    #[test]
    fn test_weeks_past_the_calendar_edges_are_none() {
        // The last supported date is a Monday, the first a Thursday
        assert_eq!(week_start(NaiveDate::MAX), Some(NaiveDate::MAX));
        assert_eq!(week_end(NaiveDate::MAX), None);
        assert_eq!(week_start(NaiveDate::MIN), None);
        assert_eq!(week_end(NaiveDate::MIN), None);
    }

    #[test]
    fn test_meal_type_parsing() {
        assert_eq!("Dinner".parse::<MealType>().unwrap(), MealType::Dinner);
        assert_eq!(" snack ".parse::<MealType>().unwrap(), MealType::Snack);
        assert!("brunch".parse::<MealType>().is_err());
    }

    #[test]
    fn test_meal_type_serde_is_snake_case() {
        let json = serde_json::to_string(&MealType::Breakfast).unwrap();
        assert_eq!(json, "\"breakfast\"");
    }
}
