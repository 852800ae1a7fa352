use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::repositories::free_time_repository::{FreeTimeRepository, FreeTimeRow};
use crate::db::repositories::step_repository::{StepRepository, StepRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::free_time::{FreeTimeCreateInput, FreeTimeRecord, FreeTimeUpdateInput};
use crate::models::step::StepStatus;
use crate::services::account_lock::AccountLocks;
use crate::services::schedule_utils;
use crate::services::task_service::normalize_title;

/// A saved free time and the scheduled steps it pushed out of the plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FreeTimeSaved {
    pub free_time: FreeTimeRecord,
    pub displaced_step_ids: Vec<String>,
}

#[derive(Clone)]
pub struct FreeTimeService {
    db: DbPool,
    locks: Arc<AccountLocks>,
}

impl FreeTimeService {
    pub fn new(db: DbPool, locks: Arc<AccountLocks>) -> Self {
        Self { db, locks }
    }

    pub fn create_free_time(&self, account_id: &str, input: FreeTimeCreateInput) -> AppResult<FreeTimeSaved> {
        schedule_utils::ensure_window(input.start_time, input.end_time)?;
        let now = Utc::now().to_rfc3339();
        let record = FreeTimeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            title: normalize_title(&input.title)?,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            weekly: input.weekly,
            created_at: now.clone(),
            updated_at: now,
        };

        let row = FreeTimeRow::from_record(&record);
        let displaced = self.locks.with_write(account_id, || {
            self.db.with_transaction(|tx| {
                FreeTimeRepository::insert(tx, &row)?;
                displace_conflicting_steps(tx, account_id, &record)
            })
        })?;

        info!(
            target: "app::planning",
            account_id,
            free_time_id = %record.id,
            displaced = displaced.len(),
            "free time created"
        );
        Ok(FreeTimeSaved {
            free_time: record,
            displaced_step_ids: displaced,
        })
    }

    pub fn update_free_time(
        &self,
        account_id: &str,
        id: &str,
        update: FreeTimeUpdateInput,
    ) -> AppResult<FreeTimeSaved> {
        let (saved, displaced) = self.locks.with_write(account_id, || {
            self.db.with_transaction(|tx| {
                // Read under the write lock so a concurrent update is merged, not overwritten.
                let mut existing = FreeTimeRepository::find_by_id(tx, account_id, id)?
                    .ok_or_else(AppError::not_found)?
                    .into_record()?;

                if let Some(title) = update.title {
                    existing.title = normalize_title(&title)?;
                }
                if let Some(date) = update.date {
                    existing.date = date;
                }
                if let Some(start) = update.start_time {
                    existing.start_time = start;
                }
                if let Some(end) = update.end_time {
                    existing.end_time = end;
                }
                if let Some(weekly) = update.weekly {
                    existing.weekly = weekly;
                }
                schedule_utils::ensure_window(existing.start_time, existing.end_time)?;
                existing.updated_at = Utc::now().to_rfc3339();

                FreeTimeRepository::update(tx, &FreeTimeRow::from_record(&existing))?;
                let displaced = displace_conflicting_steps(tx, account_id, &existing)?;
                Ok((existing, displaced))
            })
        })?;

        info!(
            target: "app::planning",
            account_id,
            free_time_id = %id,
            displaced = displaced.len(),
            "free time updated"
        );
        Ok(FreeTimeSaved {
            free_time: saved,
            displaced_step_ids: displaced,
        })
    }

    pub fn delete_free_time(&self, account_id: &str, id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| FreeTimeRepository::delete(conn, account_id, id))?;
        info!(target: "app::planning", account_id, free_time_id = %id, "free time deleted");
        Ok(())
    }

    pub fn get_free_time(&self, account_id: &str, id: &str) -> AppResult<FreeTimeRecord> {
        self.db
            .with_connection(|conn| FreeTimeRepository::find_by_id(conn, account_id, id))?
            .ok_or_else(AppError::not_found)?
            .into_record()
    }

    pub fn list_free_times(&self, account_id: &str) -> AppResult<Vec<FreeTimeRecord>> {
        let rows = self
            .db
            .with_connection(|conn| FreeTimeRepository::list_for_account(conn, account_id))?;
        let free_times = rows
            .into_iter()
            .map(FreeTimeRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::planning", account_id, count = free_times.len(), "free times listed");
        Ok(free_times)
    }
}

/// Removes scheduled steps that now collide with `free_time`; the next replan puts the work back.
fn displace_conflicting_steps(
    conn: &rusqlite::Connection,
    account_id: &str,
    free_time: &FreeTimeRecord,
) -> AppResult<Vec<String>> {
    let scheduled = StepRepository::list_by_status(conn, account_id, StepStatus::Scheduled)?
        .into_iter()
        .map(StepRow::into_record)
        .collect::<AppResult<Vec<_>>>()?;

    let mut displaced = Vec::new();
    for step in scheduled {
        let collides = free_time
            .occurrence_on(step.interval.date)
            .map(|occurrence| occurrence.overlaps(&step.interval))
            .unwrap_or(false);
        if collides {
            StepRepository::delete(conn, account_id, &step.id)?;
            displaced.push(step.id);
        }
    }
    Ok(displaced)
}
