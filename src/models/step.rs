use serde::{Deserialize, Serialize};

use crate::models::calendar::DayInterval;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Scheduled,
    Finished,
    Rated,
    Missed,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Scheduled => "scheduled",
            StepStatus::Finished => "finished",
            StepStatus::Rated => "rated",
            StepStatus::Missed => "missed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(StepStatus::Scheduled),
            "finished" => Some(StepStatus::Finished),
            "rated" => Some(StepStatus::Rated),
            "missed" => Some(StepStatus::Missed),
            _ => None,
        }
    }

    /// Finished, rated and missed steps are history and never discarded by a replan.
    pub fn is_terminal(self) -> bool {
        !matches!(self, StepStatus::Scheduled)
    }

    /// Whether the step still blocks its slot for other placements.
    pub fn occupies_slot(self) -> bool {
        !matches!(self, StepStatus::Missed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum RatingLevel {
    Lowest,
    Low,
    Medium,
    High,
    Highest,
}

impl RatingLevel {
    pub fn score(self) -> i64 {
        match self {
            RatingLevel::Lowest => 1,
            RatingLevel::Low => 2,
            RatingLevel::Medium => 3,
            RatingLevel::High => 4,
            RatingLevel::Highest => 5,
        }
    }

    pub fn from_score(score: i64) -> Option<Self> {
        match score {
            1 => Some(RatingLevel::Lowest),
            2 => Some(RatingLevel::Low),
            3 => Some(RatingLevel::Medium),
            4 => Some(RatingLevel::High),
            5 => Some(RatingLevel::Highest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnitRatings {
    pub goal_completion: RatingLevel,
    pub perceived_duration: RatingLevel,
    pub concentration: RatingLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub id: String,
    pub account_id: String,
    pub task_id: String,
    #[serde(flatten)]
    pub interval: DayInterval,
    pub status: StepStatus,
    /// Recorded when the step is marked finished; may differ from the planned length.
    pub actual_minutes: Option<i64>,
    pub ratings: Option<UnitRatings>,
    pub created_at: String,
    pub updated_at: String,
}

impl StepRecord {
    pub fn planned_minutes(&self) -> i64 {
        self.interval.duration_minutes()
    }

    /// Minutes this step contributes toward its task's demand.
    pub fn credited_minutes(&self) -> i64 {
        match self.status {
            StepStatus::Missed => 0,
            StepStatus::Scheduled => self.planned_minutes(),
            StepStatus::Finished | StepStatus::Rated => {
                self.actual_minutes.unwrap_or_else(|| self.planned_minutes())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarkFinishedInput {
    pub step_id: String,
    pub actual_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateUnitInput {
    pub step_id: String,
    pub ratings: UnitRatings,
}

/// Averaged ratings of one task's rated steps, on the 1..=5 scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskFeedback {
    pub task_id: String,
    pub rated_steps: i64,
    pub missed_steps: i64,
    pub goal_completion: Option<f64>,
    pub perceived_duration: Option<f64>,
    pub concentration: Option<f64>,
}
