use chrono::Weekday;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAY_START_MINUTE: i16 = 8 * 60;
pub const DEFAULT_DAY_END_MINUTE: i16 = 22 * 60;
pub const DEFAULT_MISSED_GRACE_MINUTES: i64 = 24 * 60;
pub const DEFAULT_AUTO_MOVE_LOOKAHEAD_DAYS: i64 = 28;

pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Per-account tunables of the planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerSettings {
    /// Earliest minute of the day a unit may start.
    pub day_start_minute: i16,
    /// Latest minute of the day a unit may end.
    pub day_end_minute: i16,
    /// Preferred study time of day. When both bounds are set the planner only places units
    /// inside them; manual moves still accept the whole day window.
    pub preferred_start_minute: Option<i16>,
    pub preferred_end_minute: Option<i16>,
    pub break_minutes: i64,
    pub min_unit_minutes: i64,
    pub max_unit_minutes: Option<i64>,
    pub max_daily_minutes: Option<i64>,
    pub deadline_buffer_days: i64,
    pub study_days: Vec<Weekday>,
    pub missed_grace_minutes: i64,
    pub auto_move_lookahead_days: i64,
    pub updated_at: String,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            day_start_minute: DEFAULT_DAY_START_MINUTE,
            day_end_minute: DEFAULT_DAY_END_MINUTE,
            preferred_start_minute: None,
            preferred_end_minute: None,
            break_minutes: 0,
            min_unit_minutes: 0,
            max_unit_minutes: None,
            max_daily_minutes: None,
            deadline_buffer_days: 0,
            study_days: ALL_WEEKDAYS.to_vec(),
            missed_grace_minutes: DEFAULT_MISSED_GRACE_MINUTES,
            auto_move_lookahead_days: DEFAULT_AUTO_MOVE_LOOKAHEAD_DAYS,
            updated_at: String::new(),
        }
    }
}

impl PlannerSettings {
    pub fn is_study_day(&self, weekday: Weekday) -> bool {
        self.study_days.contains(&weekday)
    }

    /// Minutes of the day the planner fills: the preferred range if set, else the day window.
    pub fn planning_window(&self) -> (i16, i16) {
        match (self.preferred_start_minute, self.preferred_end_minute) {
            (Some(start), Some(end)) => (start, end),
            _ => (self.day_start_minute, self.day_end_minute),
        }
    }
}

/// Partial update; `Some(None)` clears an optional cap or preferred bound.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerSettingsUpdate {
    #[serde(default)]
    pub day_start_minute: Option<i16>,
    #[serde(default)]
    pub day_end_minute: Option<i16>,
    #[serde(default)]
    pub preferred_start_minute: Option<Option<i16>>,
    #[serde(default)]
    pub preferred_end_minute: Option<Option<i16>>,
    #[serde(default)]
    pub break_minutes: Option<i64>,
    #[serde(default)]
    pub min_unit_minutes: Option<i64>,
    #[serde(default)]
    pub max_unit_minutes: Option<Option<i64>>,
    #[serde(default)]
    pub max_daily_minutes: Option<Option<i64>>,
    #[serde(default)]
    pub deadline_buffer_days: Option<i64>,
    #[serde(default)]
    pub study_days: Option<Vec<Weekday>>,
    #[serde(default)]
    pub missed_grace_minutes: Option<i64>,
    #[serde(default)]
    pub auto_move_lookahead_days: Option<i64>,
}
