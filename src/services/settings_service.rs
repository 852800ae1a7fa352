use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::db::repositories::settings_repository::SettingsRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{PlannerSettings, PlannerSettingsUpdate};
use crate::services::schedule_utils::MINUTES_PER_DAY;

/// Per-account planner settings with a read-through cache.
pub struct SettingsService {
    db: DbPool,
    cache: RwLock<HashMap<String, PlannerSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, account_id: &str) -> AppResult<PlannerSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.get(account_id) {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_from_db(account_id)?;
        if let Ok(mut guard) = self.cache.write() {
            guard.insert(account_id.to_string(), settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, account_id: &str, input: PlannerSettingsUpdate) -> AppResult<PlannerSettings> {
        let mut current = self.get(account_id)?;

        if let Some(start) = input.day_start_minute {
            current.day_start_minute = start;
        }
        if let Some(end) = input.day_end_minute {
            current.day_end_minute = end;
        }
        if let Some(start) = input.preferred_start_minute {
            current.preferred_start_minute = start;
        }
        if let Some(end) = input.preferred_end_minute {
            current.preferred_end_minute = end;
        }
        if let Some(minutes) = input.break_minutes {
            current.break_minutes = minutes;
        }
        if let Some(minutes) = input.min_unit_minutes {
            current.min_unit_minutes = minutes;
        }
        if let Some(cap) = input.max_unit_minutes {
            current.max_unit_minutes = cap;
        }
        if let Some(cap) = input.max_daily_minutes {
            current.max_daily_minutes = cap;
        }
        if let Some(days) = input.deadline_buffer_days {
            current.deadline_buffer_days = days;
        }
        if let Some(days) = input.study_days {
            current.study_days = days;
        }
        if let Some(minutes) = input.missed_grace_minutes {
            current.missed_grace_minutes = minutes;
        }
        if let Some(days) = input.auto_move_lookahead_days {
            current.auto_move_lookahead_days = days;
        }

        validate(&current)?;
        current.updated_at = Utc::now().to_rfc3339();

        let payload = serde_json::to_string(&current)?;
        self.db.with_connection(|conn| {
            SettingsRepository::upsert(conn, account_id, &payload, &current.updated_at)
        })?;

        info!(target: "app::settings", account_id, "planner settings updated");

        if let Ok(mut guard) = self.cache.write() {
            guard.insert(account_id.to_string(), current.clone());
        }
        Ok(current)
    }

    pub fn reset(&self, account_id: &str) -> AppResult<PlannerSettings> {
        self.db
            .with_connection(|conn| SettingsRepository::delete(conn, account_id))?;
        if let Ok(mut guard) = self.cache.write() {
            guard.remove(account_id);
        }
        Ok(PlannerSettings::default())
    }

    fn load_from_db(&self, account_id: &str) -> AppResult<PlannerSettings> {
        let stored = self
            .db
            .with_connection(|conn| SettingsRepository::get(conn, account_id))?;

        let Some(row) = stored else {
            return Ok(PlannerSettings::default());
        };

        match serde_json::from_str::<PlannerSettings>(&row.value) {
            Ok(mut settings) => {
                settings.updated_at = row.updated_at;
                Ok(settings)
            }
            Err(err) => {
                warn!(
                    target: "app::settings",
                    account_id,
                    error = %err,
                    "stored planner settings unreadable, falling back to defaults"
                );
                Ok(PlannerSettings::default())
            }
        }
    }
}

pub fn validate(settings: &PlannerSettings) -> AppResult<()> {
    let start = i64::from(settings.day_start_minute);
    let end = i64::from(settings.day_end_minute);
    if start < 0 || end >= MINUTES_PER_DAY || start >= end {
        return Err(AppError::validation_with_details(
            "day window must satisfy 0 <= start < end < 1440",
            json!({"dayStartMinute": start, "dayEndMinute": end}),
        ));
    }

    match (settings.preferred_start_minute, settings.preferred_end_minute) {
        (None, None) => {}
        (Some(preferred_start), Some(preferred_end)) => {
            let preferred_start = i64::from(preferred_start);
            let preferred_end = i64::from(preferred_end);
            if preferred_start < start || preferred_end > end || preferred_start >= preferred_end {
                return Err(AppError::validation_with_details(
                    "preferred study time must be a non-empty range inside the day window",
                    json!({"preferredStartMinute": preferred_start, "preferredEndMinute": preferred_end}),
                ));
            }
        }
        _ => {
            return Err(AppError::validation(
                "preferredStartMinute and preferredEndMinute must be set together",
            ));
        }
    }

    let non_negative = [
        ("breakMinutes", settings.break_minutes),
        ("minUnitMinutes", settings.min_unit_minutes),
        ("deadlineBufferDays", settings.deadline_buffer_days),
        ("missedGraceMinutes", settings.missed_grace_minutes),
    ];
    for (field, value) in non_negative {
        if value < 0 {
            return Err(AppError::validation_with_details(
                "value must not be negative",
                json!({"field": field, "value": value}),
            ));
        }
    }

    for (field, cap) in [
        ("maxUnitMinutes", settings.max_unit_minutes),
        ("maxDailyMinutes", settings.max_daily_minutes),
    ] {
        if let Some(value) = cap {
            if value <= 0 {
                return Err(AppError::validation_with_details(
                    "cap must be positive",
                    json!({"field": field, "value": value}),
                ));
            }
        }
    }

    if let Some(max_unit) = settings.max_unit_minutes {
        if settings.min_unit_minutes > max_unit {
            return Err(AppError::validation(
                "minUnitMinutes must not exceed maxUnitMinutes",
            ));
        }
    }

    if settings.auto_move_lookahead_days < 1 {
        return Err(AppError::validation("autoMoveLookaheadDays must be at least 1"));
    }

    if settings.study_days.is_empty() {
        return Err(AppError::validation("at least one study day is required"));
    }

    Ok(())
}
