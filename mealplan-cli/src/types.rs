//! Common types used across CLI modules

use chrono::NaiveDate;
use mealplan_core::domain::slot::{MealType, SlotRef};
use std::str::FromStr;
use uuid::Uuid;

/// Identifier that can be either a full UUID or an unambiguous prefix
#[derive(Debug, Clone)]
pub enum IdOrPrefix {
    /// Full UUID
    Full(Uuid),
    /// Prefix that should uniquely identify an active job
    Prefix(String),
}

impl IdOrPrefix {
    /// Attempts to parse as a full UUID first, otherwise treats as a prefix
    pub fn parse(input: &str) -> Self {
        match Uuid::parse_str(input) {
            Ok(uuid) => IdOrPrefix::Full(uuid),
            Err(_) => IdOrPrefix::Prefix(input.to_lowercase()),
        }
    }
}

/// A `DATE:MEAL` pair from the command line, e.g. `2025-06-02:dinner`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotArg {
    pub date: NaiveDate,
    pub meal_type: MealType,
}

impl FromStr for SlotArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date, meal_type) = s
            .split_once(':')
            .ok_or_else(|| format!("expected DATE:MEAL, got '{}'", s))?;

        Ok(SlotArg {
            date: date
                .parse()
                .map_err(|e| format!("invalid date '{}': {}", date, e))?,
            meal_type: meal_type.parse().map_err(|e| format!("{}", e))?,
        })
    }
}

impl From<SlotArg> for SlotRef {
    fn from(arg: SlotArg) -> Self {
        SlotRef::new(arg.date, arg.meal_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_arg_parsing() {
        let slot: SlotArg = "2025-06-02:Dinner".parse().unwrap();
        assert_eq!(slot.date, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        assert_eq!(slot.meal_type, MealType::Dinner);

        assert!("2025-06-02".parse::<SlotArg>().is_err());
        assert!("2025-13-02:lunch".parse::<SlotArg>().is_err());
        assert!("2025-06-02:brunch".parse::<SlotArg>().is_err());
    }

    #[test]
    fn test_id_or_prefix() {
        let id = Uuid::new_v4();
        assert!(matches!(IdOrPrefix::parse(&id.to_string()), IdOrPrefix::Full(u) if u == id));
        assert!(matches!(IdOrPrefix::parse("AB12"), IdOrPrefix::Prefix(p) if p == "ab12"));
    }
}
