use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::calendar::{DayInterval, Horizon};
use crate::models::step::StepRecord;

/// "`required_minutes` of this task must be placed in `[release, deadline]`."
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DemandWindow {
    pub task_id: String,
    pub release: NaiveDate,
    pub deadline: NaiveDate,
    pub required_minutes: i64,
}

/// A placement produced by the allocator, before it is persisted as a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStep {
    pub task_id: String,
    #[serde(flatten)]
    pub interval: DayInterval,
}

/// A demand window that could not be satisfied before its deadline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Underfill {
    pub task_id: String,
    pub deadline: NaiveDate,
    pub required_minutes: i64,
    pub placed_minutes: i64,
    pub missing_minutes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub steps: Vec<PlannedStep>,
    pub underfills: Vec<Underfill>,
}

impl Allocation {
    pub fn placed_minutes(&self) -> i64 {
        self.steps.iter().map(|step| step.interval.duration_minutes()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutcome {
    pub horizon: Horizon,
    /// Every step in the horizon after the replan, kept history included.
    pub steps: Vec<StepRecord>,
    pub underfills: Vec<Underfill>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanInput {
    #[serde(default)]
    pub horizon: Option<Horizon>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveUnitInput {
    pub step_id: String,
    pub date: NaiveDate,
    pub start: NaiveTime,
    /// Keeps the step's current length when absent.
    #[serde(default)]
    pub end: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FreeTimeOccurrence {
    pub free_time_id: String,
    pub title: String,
    #[serde(flatten)]
    pub interval: DayInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub steps: Vec<StepRecord>,
    pub free_times: Vec<FreeTimeOccurrence>,
}

/// Read-time grouping of steps and free times; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub horizon: Horizon,
    pub days: Vec<DayPlan>,
}

impl PlanView {
    /// Steps grouped by weekday, Monday first.
    pub fn by_weekday(&self) -> Vec<(Weekday, Vec<&StepRecord>)> {
        let mut grouped: Vec<(Weekday, Vec<&StepRecord>)> = Vec::new();
        for day in &self.days {
            match grouped.iter_mut().find(|(weekday, _)| *weekday == day.weekday) {
                Some((_, steps)) => steps.extend(day.steps.iter()),
                None => grouped.push((day.weekday, day.steps.iter().collect())),
            }
        }
        grouped.sort_by_key(|(weekday, _)| weekday.num_days_from_monday());
        grouped
    }
}
