use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use rusqlite::Connection;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::db::repositories::step_repository::{StepRepository, StepRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::step::{
    MarkFinishedInput, RateUnitInput, StepRecord, StepStatus, TaskFeedback, UnitRatings,
};
use crate::services::account_lock::AccountLocks;
use crate::services::clock::Clock;
use crate::services::schedule_utils;
use crate::services::settings_service::SettingsService;

/// Lifecycle transitions of steps after they were placed:
/// `Scheduled -> Finished -> Rated` or `Scheduled -> Missed`.
///
/// Ratings are stored for feedback summaries only; allocation does not read them.
#[derive(Clone)]
pub struct RatingService {
    db: DbPool,
    settings: Arc<SettingsService>,
    locks: Arc<AccountLocks>,
    clock: Arc<dyn Clock>,
}

impl RatingService {
    pub fn new(
        db: DbPool,
        settings: Arc<SettingsService>,
        locks: Arc<AccountLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            settings,
            locks,
            clock,
        }
    }

    pub fn mark_unit_finished(&self, account_id: &str, input: MarkFinishedInput) -> AppResult<StepRecord> {
        if input.actual_minutes < 0 {
            return Err(AppError::validation("actual duration must not be negative"));
        }

        let step = self.transition(account_id, &input.step_id, StepStatus::Finished, |step| {
            step.actual_minutes = Some(input.actual_minutes);
            Ok(())
        })?;
        info!(
            target: "app::rating",
            account_id,
            step_id = %step.id,
            actual_minutes = input.actual_minutes,
            planned_minutes = step.planned_minutes(),
            "unit finished"
        );
        Ok(step)
    }

    pub fn rate_unit(&self, account_id: &str, input: RateUnitInput) -> AppResult<StepRecord> {
        let ratings = input.ratings;
        let step = self.locks.with_write(account_id, || {
            let mut conn = self.db.get_connection()?;
            let tx = conn.transaction()?;
            let tx_conn = tx.deref();

            let mut step = find_step(tx_conn, account_id, &input.step_id)?;
            if step.status != StepStatus::Finished {
                return Err(AppError::invalid_state(format!(
                    "only finished units can be rated, unit {} is {}",
                    step.id,
                    step.status.as_str()
                )));
            }

            let stamp = Utc::now().to_rfc3339();
            step.status = StepStatus::Rated;
            step.ratings = Some(ratings);
            step.updated_at = stamp.clone();
            StepRepository::update(tx_conn, &StepRow::from_record(&step))?;
            StepRepository::upsert_rating(tx_conn, account_id, &step.id, &ratings, &stamp)?;
            tx.commit()?;
            Ok(step)
        })?;

        info!(target: "app::rating", account_id, step_id = %step.id, ratings = ?ratings, "unit rated");
        Ok(step)
    }

    /// Marks a scheduled unit as missed; its slot becomes free for the next replan.
    pub fn rate_unit_missed(&self, account_id: &str, step_id: &str) -> AppResult<StepRecord> {
        let step = self.transition(account_id, step_id, StepStatus::Missed, |_| Ok(()))?;
        info!(target: "app::rating", account_id, step_id = %step.id, "unit marked missed");
        Ok(step)
    }

    /// Ids of finished, unrated units whose end has passed.
    pub fn list_rateable(&self, account_id: &str) -> AppResult<Vec<String>> {
        let now = self.clock.now();
        let finished = self.locks.with_read(account_id, || {
            self.db.with_connection(|conn| {
                load_records(StepRepository::list_by_status(conn, account_id, StepStatus::Finished)?)
            })
        })?;

        Ok(finished
            .into_iter()
            .filter(|step| step.ratings.is_none() && step.interval.end_datetime() <= now)
            .map(|step| step.id)
            .collect())
    }

    /// Flips scheduled units whose end lies more than the grace period in the past to missed.
    pub fn sweep_missed_units(&self, account_id: &str) -> AppResult<Vec<String>> {
        let settings = self.settings.get(account_id)?;
        let cutoff = self.clock.now() - Duration::minutes(settings.missed_grace_minutes.max(0));

        let missed = self.locks.with_write(account_id, || {
            let mut conn = self.db.get_connection()?;
            let tx = conn.transaction()?;
            let tx_conn = tx.deref();

            let scheduled =
                load_records(StepRepository::list_by_status(tx_conn, account_id, StepStatus::Scheduled)?)?;
            let stamp = Utc::now().to_rfc3339();
            let mut missed = Vec::new();
            for mut step in scheduled {
                if step.interval.end_datetime() > cutoff {
                    continue;
                }
                step.status = StepStatus::Missed;
                step.updated_at = stamp.clone();
                StepRepository::update(tx_conn, &StepRow::from_record(&step))?;
                missed.push(step.id);
            }
            tx.commit()?;
            Ok(missed)
        })?;

        if !missed.is_empty() {
            info!(target: "app::rating", account_id, count = missed.len(), "elapsed units marked missed");
        }
        Ok(missed)
    }

    /// Runs the missed sweep for every account that still has elapsed scheduled units.
    /// An account that fails is logged and skipped; the count covers the others.
    pub fn sweep_all_accounts(&self) -> AppResult<usize> {
        let today = schedule_utils::format_date(self.clock.now().date());
        let accounts = self
            .db
            .with_connection(|conn| StepRepository::list_accounts_with_scheduled_before(conn, &today))?;

        let mut total = 0;
        for account_id in accounts {
            match self.sweep_missed_units(&account_id) {
                Ok(missed) => total += missed.len(),
                Err(err) => error!(
                    target: "app::rating",
                    account_id = %account_id,
                    error = %err,
                    "missed sweep failed for account, continuing"
                ),
            }
        }
        debug!(target: "app::rating", total, "missed sweep finished");
        Ok(total)
    }

    pub fn task_feedback(&self, account_id: &str, task_id: &str) -> AppResult<TaskFeedback> {
        let steps = self.locks.with_read(account_id, || {
            self.db.with_connection(|conn| {
                load_records(StepRepository::list_for_task(conn, account_id, task_id)?)
            })
        })?;

        let rated = steps
            .iter()
            .filter_map(|step| step.ratings)
            .collect::<Vec<UnitRatings>>();
        let missed_steps = steps
            .iter()
            .filter(|step| step.status == StepStatus::Missed)
            .count() as i64;

        let average = |pick: fn(&UnitRatings) -> i64| -> Option<f64> {
            if rated.is_empty() {
                None
            } else {
                Some(rated.iter().map(pick).sum::<i64>() as f64 / rated.len() as f64)
            }
        };

        Ok(TaskFeedback {
            task_id: task_id.to_string(),
            rated_steps: rated.len() as i64,
            missed_steps,
            goal_completion: average(|r| r.goal_completion.score()),
            perceived_duration: average(|r| r.perceived_duration.score()),
            concentration: average(|r| r.concentration.score()),
        })
    }

    fn transition(
        &self,
        account_id: &str,
        step_id: &str,
        next: StepStatus,
        apply: impl FnOnce(&mut StepRecord) -> AppResult<()>,
    ) -> AppResult<StepRecord> {
        self.locks.with_write(account_id, || {
            self.db.with_transaction(|tx| {
                let mut step = find_step(tx, account_id, step_id)?;
                if step.status != StepStatus::Scheduled {
                    return Err(AppError::invalid_state(format!(
                        "unit {} is {} and cannot become {}",
                        step.id,
                        step.status.as_str(),
                        next.as_str()
                    )));
                }
                apply(&mut step)?;
                step.status = next;
                step.updated_at = Utc::now().to_rfc3339();
                StepRepository::update(tx, &StepRow::from_record(&step))?;
                Ok(step)
            })
        })
    }
}

/// Periodically runs [`RatingService::sweep_all_accounts`] on the blocking pool.
pub fn spawn_missed_sweep(service: Arc<RatingService>, period: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let service = Arc::clone(&service);
            match tokio::task::spawn_blocking(move || service.sweep_all_accounts()).await {
                Ok(Ok(count)) => debug!(target: "app::rating", count, "periodic missed sweep"),
                Ok(Err(err)) => error!(target: "app::rating", error = %err, "missed sweep failed"),
                Err(join_err) => error!(target: "app::rating", error = %join_err, "missed sweep task panicked"),
            }
        }
    })
}

fn find_step(conn: &Connection, account_id: &str, step_id: &str) -> AppResult<StepRecord> {
    StepRepository::find_by_id(conn, account_id, step_id)?
        .ok_or_else(AppError::not_found)?
        .into_record()
}

fn load_records(rows: Vec<StepRow>) -> AppResult<Vec<StepRecord>> {
    rows.into_iter().map(StepRow::into_record).collect()
}
