use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The three task variants. The constraint catalog is the only place that
/// branches on this; everything downstream sees demand windows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaskKind {
    #[serde(rename_all = "camelCase")]
    Exam { exam_date: NaiveDate },
    #[serde(rename_all = "camelCase")]
    Submission {
        first_date: NaiveDateTime,
        cycle: u32,
        /// No deadlines are generated after this date.
        #[serde(default)]
        last_date: Option<NaiveDate>,
    },
    #[serde(rename_all = "camelCase")]
    Other { start: NaiveDate, end: NaiveDate },
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Exam { .. } => "exam",
            TaskKind::Submission { .. } => "submission",
            TaskKind::Other { .. } => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub account_id: String,
    pub module_id: String,
    pub title: String,
    /// Minutes per week the task should consume.
    pub weekly_time_load: i64,
    pub send_notification: bool,
    pub kind: TaskKind,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateInput {
    pub module_id: String,
    pub title: String,
    pub weekly_time_load: i64,
    #[serde(default)]
    pub send_notification: bool,
    pub kind: TaskKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateInput {
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub weekly_time_load: Option<i64>,
    #[serde(default)]
    pub send_notification: Option<bool>,
    #[serde(default)]
    pub kind: Option<TaskKind>,
}
