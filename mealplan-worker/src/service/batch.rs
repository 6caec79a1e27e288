//! Per-day generation batches
//!
//! A job's slots are generated one date at a time. The model's answer for a
//! batch must name exactly the batch's meal types.

use chrono::NaiveDate;
use mealplan_core::domain::job::{GeneratedMeal, JobTarget};
use mealplan_core::domain::plan::Meal;
use mealplan_core::domain::slot::MealType;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Meal types requested for one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBatch {
    pub date: NaiveDate,
    pub meal_types: Vec<MealType>,
}

/// Groups the target's slots by date, keeping the requested meal type order
pub fn split_batches(target: &JobTarget) -> Vec<DayBatch> {
    let mut by_date: BTreeMap<NaiveDate, Vec<MealType>> = BTreeMap::new();
    for slot in target.slots() {
        by_date.entry(slot.date).or_default().push(slot.meal_type);
    }

    by_date
        .into_iter()
        .map(|(date, meal_types)| DayBatch { date, meal_types })
        .collect()
}

/// Model answer for one batch, with or without the `meals` wrapper
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchPayload {
    Wrapped { meals: Vec<PayloadMeal> },
    Bare(Vec<PayloadMeal>),
}

#[derive(Debug, Deserialize)]
pub struct PayloadMeal {
    #[serde(deserialize_with = "lenient_meal_type")]
    pub meal_type: MealType,
    #[serde(flatten)]
    pub meal: Meal,
}

fn lenient_meal_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MealType, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotMismatch {
    #[error("missing meal types: {}", join(.0))]
    Missing(Vec<MealType>),

    #[error("unrequested meal type: {0}")]
    Unexpected(MealType),

    #[error("meal type returned twice: {0}")]
    Duplicate(MealType),
}

fn join(meal_types: &[MealType]) -> String {
    meal_types
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl BatchPayload {
    /// Converts the answer into generated meals in the batch's order
    pub fn into_meals(self, batch: &DayBatch) -> Result<Vec<GeneratedMeal>, SlotMismatch> {
        let meals = match self {
            BatchPayload::Wrapped { meals } | BatchPayload::Bare(meals) => meals,
        };

        let requested: BTreeSet<MealType> = batch.meal_types.iter().copied().collect();
        let mut by_type = BTreeMap::new();

        for entry in meals {
            if !requested.contains(&entry.meal_type) {
                return Err(SlotMismatch::Unexpected(entry.meal_type));
            }
            if by_type.insert(entry.meal_type, entry.meal).is_some() {
                return Err(SlotMismatch::Duplicate(entry.meal_type));
            }
        }

        let missing: Vec<MealType> = batch
            .meal_types
            .iter()
            .filter(|m| !by_type.contains_key(m))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(SlotMismatch::Missing(missing));
        }

        Ok(batch
            .meal_types
            .iter()
            .filter_map(|meal_type| {
                by_type.remove(meal_type).map(|meal| GeneratedMeal {
                    date: batch.date,
                    meal_type: *meal_type,
                    meal,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_payload;
    use mealplan_core::domain::slot::SlotRef;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn batch() -> DayBatch {
        DayBatch {
            date: date(2),
            meal_types: vec![MealType::Lunch, MealType::Dinner],
        }
    }

    #[test]
    fn test_split_groups_slots_by_date() {
        let target = JobTarget::Slots {
            slots: vec![
                SlotRef::new(date(3), MealType::Dinner),
                SlotRef::new(date(2), MealType::Lunch),
                SlotRef::new(date(3), MealType::Breakfast),
            ],
        };

        let batches = split_batches(&target);

        assert_eq!(
            batches,
            vec![
                DayBatch {
                    date: date(2),
                    meal_types: vec![MealType::Lunch],
                },
                DayBatch {
                    date: date(3),
                    meal_types: vec![MealType::Dinner, MealType::Breakfast],
                },
            ]
        );
    }

    #[test]
    fn test_week_target_yields_seven_batches() {
        let target = JobTarget::Week {
            start_date: date(2),
            meal_types: vec![MealType::Breakfast, MealType::Dinner],
        };

        let batches = split_batches(&target);

        assert_eq!(batches.len(), 7);
        assert!(batches.iter().all(|b| b.meal_types.len() == 2));
    }

    #[test]
    fn test_payload_accepts_bare_array_and_loose_meal_types() {
        let raw = r#"[
            {"meal_type": "Dinner", "name": "Risotto"},
            {"meal_type": "lunch", "name": "Caesar salad", "prep_minutes": 15}
        ]"#;

        let meals = extract_payload::<BatchPayload>(raw)
            .unwrap()
            .into_meals(&batch())
            .unwrap();

        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0].meal_type, MealType::Lunch);
        assert_eq!(meals[0].meal.name, "Caesar salad");
        assert_eq!(meals[1].meal.name, "Risotto");
        assert!(meals.iter().all(|m| m.date == date(2)));
    }

    #[test]
    fn test_payload_must_cover_exactly_the_batch() {
        let missing = r#"{"meals": [{"meal_type": "lunch", "name": "Soup"}]}"#;
        assert_eq!(
            extract_payload::<BatchPayload>(missing)
                .unwrap()
                .into_meals(&batch())
                .unwrap_err(),
            SlotMismatch::Missing(vec![MealType::Dinner])
        );

        let extra = r#"{"meals": [
            {"meal_type": "lunch", "name": "Soup"},
            {"meal_type": "dinner", "name": "Stew"},
            {"meal_type": "snack", "name": "Nuts"}
        ]}"#;
        assert_eq!(
            extract_payload::<BatchPayload>(extra)
                .unwrap()
                .into_meals(&batch())
                .unwrap_err(),
            SlotMismatch::Unexpected(MealType::Snack)
        );
    }
}
