//! Job domain types
//!
//! A job is one request to generate meal content. The orchestrator owns the
//! row, the worker moves it through its lifecycle.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::plan::Meal;
use crate::domain::slot::{MealType, Slot, SlotRef, default_meal_types, week_end};

/// Upper bound on the number of slots a single multi-slot job may name
pub const MAX_SLOTS_PER_JOB: usize = 42;

/// Generation job record
///
/// Structure shared between orchestrator (persists) and worker (updates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub owner: Uuid,
    pub mode: JobMode,
    pub target: JobTarget,
    pub constraints: Constraints,
    pub status: JobStatus,
    pub progress: Option<JobProgress>,
    pub result: Option<JobResult>,
    pub error_message: Option<String>,
    /// Day containers resolved for the target at submission time
    #[serde(default)]
    pub containers: Vec<DayRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates a new pending job
    pub fn new(
        owner: Uuid,
        mode: JobMode,
        target: JobTarget,
        constraints: Constraints,
        containers: Vec<DayRef>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            mode,
            target,
            constraints,
            status: JobStatus::Pending,
            progress: None,
            result: None,
            error_message: None,
            containers,
            created_at: now,
            updated_at: now,
        }
    }

    /// Last time anything observed this job being worked on
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.updated_at.max(self.created_at)
    }

    /// Whether an active job has gone quiet for longer than `timeout`
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        self.status.is_active() && now - self.last_touched() > timeout
    }

    pub fn day_ref(&self, date: NaiveDate) -> Option<&DayRef> {
        self.containers.iter().find(|c| c.date == date)
    }
}

/// Which worker variant a job is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    Weekly,
    Single,
    Regenerate,
    MultiSlot,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Weekly => "weekly",
            JobMode::Single => "single",
            JobMode::Regenerate => "regenerate",
            JobMode::MultiSlot => "multi_slot",
        }
    }

    /// Path segment of the worker endpoint that handles this mode
    pub fn worker_route(&self) -> &'static str {
        match self {
            JobMode::Weekly => "weekly",
            JobMode::Single => "single",
            JobMode::Regenerate => "regenerate",
            JobMode::MultiSlot => "multi-slot",
        }
    }
}

impl std::fmt::Display for JobMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(JobMode::Weekly),
            "single" => Ok(JobMode::Single),
            "regenerate" => Ok(JobMode::Regenerate),
            "multi_slot" | "multi-slot" => Ok(JobMode::MultiSlot),
            other => Err(format!("unknown job mode: {}", other)),
        }
    }
}

/// Job lifecycle status
///
/// `Pending` and `Processing` are active. `Completed` and `Failed` are
/// terminal and never left again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ACTIVE: [JobStatus; 2] = [JobStatus::Pending, JobStatus::Processing];

    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Whether the state machine allows moving from `self` to `next`
    ///
    /// `Processing -> Processing` is a progress write.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending | JobStatus::Processing => next != JobStatus::Pending,
            JobStatus::Completed | JobStatus::Failed => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// What a job generates content for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobTarget {
    /// One meal slot
    Slot(SlotRef),
    /// Every listed meal type on one date
    Day {
        date: NaiveDate,
        #[serde(default = "default_meal_types")]
        meal_types: Vec<MealType>,
    },
    /// Every listed meal type on seven consecutive dates
    Week {
        start_date: NaiveDate,
        #[serde(default = "default_meal_types")]
        meal_types: Vec<MealType>,
    },
    /// A sparse, ordered list of slots
    Slots { slots: Vec<SlotRef> },
}

impl JobTarget {
    /// Expands the target into its slots, in generation order
    pub fn slots(&self) -> Vec<Slot> {
        match self {
            JobTarget::Slot(slot) => vec![slot.slot()],
            JobTarget::Day { date, meal_types } => {
                meal_types.iter().map(|m| Slot::new(*date, *m)).collect()
            }
            JobTarget::Week {
                start_date,
                meal_types,
            } => (0..7)
                .filter_map(|offset| start_date.checked_add_days(Days::new(offset)))
                .flat_map(|date| meal_types.iter().map(move |m| Slot::new(date, *m)))
                .collect(),
            JobTarget::Slots { slots } => slots.iter().map(SlotRef::slot).collect(),
        }
    }

    /// Distinct dates the target touches, ascending
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.slots()
            .into_iter()
            .map(|s| s.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether any covered date falls inside the inclusive range
    pub fn intersects_range(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        self.dates().into_iter().any(|date| {
            from.is_none_or(|from| date >= from) && to.is_none_or(|to| date <= to)
        })
    }

    /// Whether two targets share at least one slot
    pub fn overlaps(&self, other: &JobTarget) -> bool {
        let mine: HashSet<Slot> = self.slots().into_iter().collect();
        other.slots().iter().any(|slot| mine.contains(slot))
    }

    /// The replaced meal id named for `slot`, if any
    pub fn existing_meal_id(&self, slot: Slot) -> Option<Uuid> {
        match self {
            JobTarget::Slot(s) if s.slot() == slot => s.existing_meal_id,
            JobTarget::Slots { slots } => slots
                .iter()
                .find(|s| s.slot() == slot)
                .and_then(|s| s.existing_meal_id),
            _ => None,
        }
    }

    /// Checks that the target is well formed for `mode`
    ///
    /// Every covered date, and the week container around it, must be a date
    /// chrono can represent.
    pub fn validate_for(&self, mode: JobMode) -> Result<(), TargetError> {
        self.validate_shape(mode)?;
        self.validate_dates()
    }

    fn validate_dates(&self) -> Result<(), TargetError> {
        if let JobTarget::Week { start_date, .. } = self {
            if start_date.checked_add_days(Days::new(6)).is_none() {
                return Err(TargetError::DateOutOfRange(*start_date));
            }
        }

        match self.dates().into_iter().find(|date| week_end(*date).is_none()) {
            Some(date) => Err(TargetError::DateOutOfRange(date)),
            None => Ok(()),
        }
    }

    fn validate_shape(&self, mode: JobMode) -> Result<(), TargetError> {
        match (mode, self) {
            (JobMode::Single, JobTarget::Slot(_)) => Ok(()),
            (JobMode::Regenerate, JobTarget::Slot(_)) => Ok(()),
            (JobMode::Regenerate, JobTarget::Day { meal_types, .. }) => {
                validate_meal_types(meal_types)
            }
            (JobMode::Weekly, JobTarget::Week { meal_types, .. }) => validate_meal_types(meal_types),
            (JobMode::MultiSlot, JobTarget::Slots { slots }) => validate_slot_list(slots),
            (mode, _) => Err(TargetError::WrongShape {
                mode,
                expected: expected_shape(mode),
            }),
        }
    }
}

fn expected_shape(mode: JobMode) -> &'static str {
    match mode {
        JobMode::Single => "slot",
        JobMode::Weekly => "week",
        JobMode::MultiSlot => "slots",
        JobMode::Regenerate => "slot or day",
    }
}

fn validate_meal_types(meal_types: &[MealType]) -> Result<(), TargetError> {
    if meal_types.is_empty() {
        return Err(TargetError::EmptyMealTypes);
    }

    let mut seen = HashSet::new();
    for meal_type in meal_types {
        if !seen.insert(*meal_type) {
            return Err(TargetError::DuplicateMealType(*meal_type));
        }
    }

    Ok(())
}

fn validate_slot_list(slots: &[SlotRef]) -> Result<(), TargetError> {
    if slots.is_empty() {
        return Err(TargetError::EmptySlots);
    }

    if slots.len() > MAX_SLOTS_PER_JOB {
        return Err(TargetError::TooManySlots(slots.len()));
    }

    let mut seen = HashSet::new();
    for slot in slots {
        if !seen.insert(slot.slot()) {
            return Err(TargetError::DuplicateSlot {
                date: slot.date,
                meal_type: slot.meal_type,
            });
        }
    }

    Ok(())
}

/// Reasons a target is rejected before any job row exists
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("mode '{mode}' requires a {expected} target")]
    WrongShape {
        mode: JobMode,
        expected: &'static str,
    },
    #[error("slot list cannot be empty")]
    EmptySlots,
    #[error("slot list has {0} entries, the limit is {max}", max = MAX_SLOTS_PER_JOB)]
    TooManySlots(usize),
    #[error("slot {date} {meal_type} is listed more than once")]
    DuplicateSlot {
        date: NaiveDate,
        meal_type: MealType,
    },
    #[error("meal type list cannot be empty")]
    EmptyMealTypes,
    #[error("meal type {0} is listed more than once")]
    DuplicateMealType(MealType),
    #[error("date {0} is outside the supported calendar range")]
    DateOutOfRange(NaiveDate),
}

/// User supplied generation constraints
///
/// The orchestrator stores these verbatim; only the worker interprets them.
/// Unknown keys survive a round trip through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_prep_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Mid-flight progress counter written by the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub done: u32,
    pub total: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobProgress {
    pub fn new(done: u32, total: u32) -> Self {
        Self {
            done,
            total,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Content a completed job produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub meals: Vec<GeneratedMeal>,
}

/// One generated meal and the slot it fills
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMeal {
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub meal: Meal,
}

impl GeneratedMeal {
    pub fn slot(&self) -> Slot {
        Slot::new(self.date, self.meal_type)
    }
}

/// Day and week containers resolved for one target date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRef {
    pub date: NaiveDate,
    pub day_id: Uuid,
    pub week_id: Uuid,
}

/// Machine-readable tag carried at the front of a failed job's message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// No update within the stale timeout
    StaleRequestTimeout,
    /// The worker call could not be started
    DispatchFailed,
    /// The worker never answered the dispatch call
    DispatchTimeout,
    /// The worker answered with a non-success status
    WorkerHttpError,
    ModelUnavailable,
    InvalidModelOutput,
    WriteFailed,
    WorkerTimeout,
}

impl FailureReason {
    const ALL: [FailureReason; 8] = [
        FailureReason::StaleRequestTimeout,
        FailureReason::DispatchFailed,
        FailureReason::DispatchTimeout,
        FailureReason::WorkerHttpError,
        FailureReason::ModelUnavailable,
        FailureReason::InvalidModelOutput,
        FailureReason::WriteFailed,
        FailureReason::WorkerTimeout,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            FailureReason::StaleRequestTimeout => "stale_request_timeout",
            FailureReason::DispatchFailed => "dispatch_failed",
            FailureReason::DispatchTimeout => "dispatch_timeout",
            FailureReason::WorkerHttpError => "worker_http_error",
            FailureReason::ModelUnavailable => "model_unavailable",
            FailureReason::InvalidModelOutput => "invalid_model_output",
            FailureReason::WriteFailed => "write_failed",
            FailureReason::WorkerTimeout => "worker_timeout",
        }
    }

    /// Formats `"<tag>: <detail>"`
    pub fn with_detail(&self, detail: impl std::fmt::Display) -> String {
        format!("{}: {}", self.tag(), detail)
    }

    /// Recovers the tag from a stored error message
    pub fn from_message(message: &str) -> Option<Self> {
        let tag = message.split(':').next().unwrap_or_default().trim();
        Self::ALL.into_iter().find(|reason| reason.tag() == tag)
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
