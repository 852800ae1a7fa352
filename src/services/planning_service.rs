use std::ops::Deref;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repositories::free_time_repository::{FreeTimeRepository, FreeTimeRow};
use crate::db::repositories::step_repository::{StepRepository, StepRow};
use crate::db::repositories::task_repository::{TaskRepository, TaskRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::calendar::{DayInterval, Horizon};
use crate::models::free_time::FreeTimeRecord;
use crate::models::planning::{
    DayPlan, DemandWindow, FreeTimeOccurrence, MoveUnitInput, PlanOutcome, PlanView,
    UpdatePlanInput,
};
use crate::models::settings::PlannerSettings;
use crate::models::step::{StepRecord, StepStatus};
use crate::models::task::TaskRecord;
use crate::services::account_lock::{AccountLocks, PlanCancellation};
use crate::services::allocator::{AllocationRules, Allocator};
use crate::services::availability::{AvailabilityIndex, AvailabilityRules};
use crate::services::clock::Clock;
use crate::services::constraint_catalog::{self, CatalogRules};
use crate::services::schedule_utils;
use crate::services::settings_service::SettingsService;

/// Replans, moves and reads the step set of an account.
///
/// Every mutation holds the account's write lock and runs inside a single transaction, so the
/// non-overlap invariant is checked and committed atomically.
#[derive(Clone)]
pub struct PlanningService {
    db: DbPool,
    settings: Arc<SettingsService>,
    locks: Arc<AccountLocks>,
    clock: Arc<dyn Clock>,
}

struct Snapshot {
    tasks: Vec<TaskRecord>,
    free_times: Vec<FreeTimeRecord>,
    steps: Vec<StepRecord>,
}

impl PlanningService {
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

    pub fn update_plan(&self, account_id: &str, input: UpdatePlanInput) -> AppResult<PlanOutcome> {
        self.update_plan_with_cancel(account_id, input, &PlanCancellation::new())
    }

    /// Discards the not-yet-started scheduled steps of the horizon and allocates again from
    /// scratch. Finished, rated, missed and already started steps are kept and credited.
    pub fn update_plan_with_cancel(
        &self,
        account_id: &str,
        input: UpdatePlanInput,
        cancel: &PlanCancellation,
    ) -> AppResult<PlanOutcome> {
        let settings = self.settings.get(account_id)?;

        self.locks.with_write(account_id, || {
            let now = self.clock.now();
            let horizon = input.horizon.unwrap_or_else(|| Horizon::week_of(now.date()));

            let mut conn = self.db.get_connection()?;
            let tx = conn.transaction()?;
            let tx_conn = tx.deref();

            let snapshot = load_snapshot(tx_conn, account_id)?;
            let (discarded, kept): (Vec<StepRecord>, Vec<StepRecord>) = snapshot
                .steps
                .into_iter()
                .partition(|step| is_replaceable(step, &horizon, now));

            let mut windows = constraint_catalog::windows_for_tasks(
                &snapshot.tasks,
                &horizon,
                &catalog_rules(&settings),
            );
            constraint_catalog::credit_existing(&mut windows, &kept);

            let mut index = AvailabilityIndex::build(
                horizon,
                &AvailabilityRules::from_settings(&settings, Some(now)),
                &snapshot.free_times,
                &occupied(&kept),
            );
            let allocation = Allocator::new(AllocationRules::from_settings(&settings))
                .allocate_with_cancel(&windows, &mut index, cancel)?;

            cancel.check()?;

            for step in &discarded {
                StepRepository::delete(tx_conn, account_id, &step.id)?;
            }

            let stamp = Utc::now().to_rfc3339();
            for planned in &allocation.steps {
                let record = StepRecord {
                    id: Uuid::new_v4().to_string(),
                    account_id: account_id.to_string(),
                    task_id: planned.task_id.clone(),
                    interval: planned.interval,
                    status: StepStatus::Scheduled,
                    actual_minutes: None,
                    ratings: None,
                    created_at: stamp.clone(),
                    updated_at: stamp.clone(),
                };
                StepRepository::insert(tx_conn, &StepRow::from_record(&record))?;
            }

            let steps = list_steps_in(tx_conn, account_id, &horizon)?;
            tx.commit()?;

            for underfill in &allocation.underfills {
                warn!(
                    target: "app::planning",
                    account_id,
                    task_id = %underfill.task_id,
                    deadline = %underfill.deadline,
                    missing = underfill.missing_minutes,
                    "demand window underfilled"
                );
            }
            info!(
                target: "app::planning",
                account_id,
                horizon_start = %horizon.start,
                horizon_end = %horizon.end,
                windows = windows.len(),
                discarded = discarded.len(),
                placed = allocation.steps.len(),
                underfilled = allocation.underfills.len(),
                "plan updated"
            );

            Ok(PlanOutcome {
                horizon,
                steps,
                underfills: allocation.underfills,
                generated_at: stamp,
            })
        })
    }

    /// Moves a scheduled step to a caller-chosen slot. The step's own old slot counts as free.
    pub fn move_unit(&self, account_id: &str, input: MoveUnitInput) -> AppResult<StepRecord> {
        let settings = self.settings.get(account_id)?;

        self.locks.with_write(account_id, || {
            let now = self.clock.now();
            let mut conn = self.db.get_connection()?;
            let tx = conn.transaction()?;
            let tx_conn = tx.deref();

            let mut step = find_step(tx_conn, account_id, &input.step_id)?;
            ensure_movable(&step)?;

            let target = requested_interval(&step, &input)?;
            if target == step.interval {
                debug!(target: "app::planning", account_id, step_id = %step.id, "move to current slot, nothing to do");
                return Ok(step);
            }

            ensure_inside_day_window(&target, &settings)?;
            if target.start_datetime() < now {
                return Err(AppError::conflict("a unit cannot be moved into the past"));
            }

            let siblings = StepRepository::list_between(
                tx_conn,
                account_id,
                &schedule_utils::format_date(target.date),
                &schedule_utils::format_date(target.date),
            )?
            .into_iter()
            .map(StepRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
            if let Some(other) = siblings.iter().find(|other| {
                other.id != step.id && other.status.occupies_slot() && other.interval.overlaps(&target)
            }) {
                return Err(AppError::conflict(format!(
                    "requested slot overlaps unit {}",
                    other.id
                )));
            }

            let free_times = load_free_times(tx_conn, account_id, target.date, target.date)?;
            if let Some(blocking) = free_times.iter().find(|free_time| {
                free_time
                    .occurrence_on(target.date)
                    .map(|occurrence| occurrence.overlaps(&target))
                    .unwrap_or(false)
            }) {
                return Err(AppError::conflict(format!(
                    "requested slot overlaps free time \"{}\"",
                    blocking.title
                )));
            }

            let previous = step.interval;
            step.interval = target;
            step.updated_at = Utc::now().to_rfc3339();
            StepRepository::update(tx_conn, &StepRow::from_record(&step))?;
            tx.commit()?;

            info!(
                target: "app::planning",
                account_id,
                step_id = %step.id,
                from = ?previous,
                to = ?target,
                "unit moved"
            );
            Ok(step)
        })
    }

    /// Re-drops one scheduled step into the best remaining slot before its task's next deadline.
    /// Other slots win over the step's current one, which is only taken back when nothing else
    /// fits. On failure the step stays where it is.
    pub fn move_unit_automatically(&self, account_id: &str, step_id: &str) -> AppResult<StepRecord> {
        let settings = self.settings.get(account_id)?;

        self.locks.with_write(account_id, || {
            let now = self.clock.now();
            let today = now.date();
            let mut conn = self.db.get_connection()?;
            let tx = conn.transaction()?;
            let tx_conn = tx.deref();

            let mut step = find_step(tx_conn, account_id, step_id)?;
            ensure_movable(&step)?;

            let task = TaskRepository::find_by_id(tx_conn, account_id, &step.task_id)?
                .ok_or_else(AppError::not_found)?
                .into_record()?;

            let lookahead_end = today + Duration::days(settings.auto_move_lookahead_days.max(1));
            let window = next_applicable_window(&task, &step, today, lookahead_end, &settings)
                .ok_or_else(|| {
                    AppError::no_availability(format!(
                        "task {} has no deadline left to move unit {} toward",
                        task.id, step.id
                    ))
                })?;

            let search = Horizon::new(today, window.deadline.min(lookahead_end))?;
            let mut busy = StepRepository::list_between(
                tx_conn,
                account_id,
                &schedule_utils::format_date(search.start),
                &schedule_utils::format_date(search.end),
            )?
            .into_iter()
            .map(StepRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
            busy.retain(|other| other.id != step.id);
            let placed = occupied(&busy);

            let free_times = load_free_times(tx_conn, account_id, search.start, search.end)?;
            let availability = AvailabilityRules::from_settings(&settings, Some(now));

            let duration = step.planned_minutes();
            let allocator = Allocator::new(AllocationRules {
                min_unit_minutes: duration,
                max_unit_minutes: Some(duration),
                max_daily_minutes: settings.max_daily_minutes.filter(|cap| *cap > 0),
            });
            let demand = DemandWindow {
                task_id: task.id.clone(),
                release: search.start,
                deadline: window.deadline,
                required_minutes: duration,
            };
            let first_fit = |blocked: &[DayInterval]| {
                let mut index = AvailabilityIndex::build(search, &availability, &free_times, blocked);
                allocator
                    .allocate(std::slice::from_ref(&demand), &mut index)
                    .steps
                    .first()
                    .map(|planned| planned.interval)
            };

            let mut without_current = placed.clone();
            without_current.push(step.interval);
            let Some(new_slot) = first_fit(without_current.as_slice())
                .or_else(|| first_fit(placed.as_slice()))
            else {
                return Err(AppError::no_availability(format!(
                    "no free {duration}-minute slot before {}",
                    schedule_utils::format_date(window.deadline)
                )));
            };

            let previous = step.interval;
            if new_slot == previous {
                debug!(target: "app::planning", account_id, step_id = %step.id, "no other slot fits, unit keeps its slot");
                return Ok(step);
            }
            step.interval = new_slot;
            step.updated_at = Utc::now().to_rfc3339();
            StepRepository::update(tx_conn, &StepRow::from_record(&step))?;
            tx.commit()?;

            info!(
                target: "app::planning",
                account_id,
                step_id = %step.id,
                from = ?previous,
                to = ?new_slot,
                "unit moved automatically"
            );
            Ok(step)
        })
    }

    pub fn get_step(&self, account_id: &str, step_id: &str) -> AppResult<StepRecord> {
        self.locks.with_read(account_id, || {
            self.db
                .with_connection(|conn| find_step(conn, account_id, step_id))
        })
    }

    pub fn list_steps(&self, account_id: &str, horizon: Horizon) -> AppResult<Vec<StepRecord>> {
        self.locks.with_read(account_id, || {
            self.db
                .with_connection(|conn| list_steps_in(conn, account_id, &horizon))
        })
    }

    /// Groups the horizon's steps and free-time occurrences per day.
    pub fn plan_view(&self, account_id: &str, horizon: Option<Horizon>) -> AppResult<PlanView> {
        let horizon = horizon.unwrap_or_else(|| Horizon::week_of(self.clock.now().date()));

        let (steps, free_times) = self.locks.with_read(account_id, || {
            self.db.with_connection(|conn| {
                let steps = list_steps_in(conn, account_id, &horizon)?;
                let free_times = load_free_times(conn, account_id, horizon.start, horizon.end)?;
                Ok((steps, free_times))
            })
        })?;

        let days = horizon
            .days()
            .map(|date| DayPlan {
                date,
                weekday: date.weekday(),
                steps: steps
                    .iter()
                    .filter(|step| step.interval.date == date)
                    .cloned()
                    .collect(),
                free_times: free_times
                    .iter()
                    .filter_map(|free_time| {
                        free_time.occurrence_on(date).map(|interval| FreeTimeOccurrence {
                            free_time_id: free_time.id.clone(),
                            title: free_time.title.clone(),
                            interval,
                        })
                    })
                    .collect(),
            })
            .collect();

        Ok(PlanView { horizon, days })
    }
}

fn catalog_rules(settings: &PlannerSettings) -> CatalogRules {
    CatalogRules {
        deadline_buffer_days: settings.deadline_buffer_days.max(0),
    }
}

/// Scheduled steps inside the horizon that have not started yet.
fn is_replaceable(step: &StepRecord, horizon: &Horizon, now: NaiveDateTime) -> bool {
    step.status == StepStatus::Scheduled
        && horizon.contains(step.interval.date)
        && step.interval.start_datetime() >= now
}

fn occupied(steps: &[StepRecord]) -> Vec<DayInterval> {
    steps
        .iter()
        .filter(|step| step.status.occupies_slot())
        .map(|step| step.interval)
        .collect()
}

fn ensure_movable(step: &StepRecord) -> AppResult<()> {
    if step.status == StepStatus::Scheduled {
        Ok(())
    } else {
        Err(AppError::invalid_state(format!(
            "unit {} is {} and can no longer be moved",
            step.id,
            step.status.as_str()
        )))
    }
}

fn requested_interval(step: &StepRecord, input: &MoveUnitInput) -> AppResult<DayInterval> {
    match input.end {
        Some(end) => DayInterval::new(input.date, input.start, end),
        None => {
            let start = schedule_utils::minutes_from_midnight(input.start);
            DayInterval::from_minutes(input.date, start, start + step.planned_minutes()).ok_or_else(|| {
                AppError::validation_with_details(
                    "unit would run past the end of the day",
                    json!({"start": schedule_utils::format_time(input.start), "minutes": step.planned_minutes()}),
                )
            })
        }
    }
}

fn ensure_inside_day_window(interval: &DayInterval, settings: &PlannerSettings) -> AppResult<()> {
    let start = i64::from(settings.day_start_minute);
    let end = i64::from(settings.day_end_minute);
    if interval.start_minute() < start || interval.end_minute() > end {
        return Err(AppError::conflict(format!(
            "requested slot lies outside the day window {}-{}",
            schedule_utils::format_time(schedule_utils::to_naive_time(start as u32)),
            schedule_utils::format_time(schedule_utils::to_naive_time(end as u32)),
        )));
    }
    Ok(())
}

/// The window the step belongs to if it is still open, otherwise the task's next open window.
fn next_applicable_window(
    task: &TaskRecord,
    step: &StepRecord,
    today: NaiveDate,
    lookahead_end: NaiveDate,
    settings: &PlannerSettings,
) -> Option<DemandWindow> {
    let earliest = step.interval.date.min(today);
    let range = Horizon::new(earliest, lookahead_end).ok()?;
    // Only deadlines matter here, so a zero load must not hide the windows.
    let deadline_task = TaskRecord {
        weekly_time_load: task.weekly_time_load.max(1),
        ..task.clone()
    };
    let windows = constraint_catalog::demand_windows(&deadline_task, &range, &catalog_rules(settings));

    windows
        .iter()
        .find(|window| {
            window.release <= step.interval.date
                && step.interval.date <= window.deadline
                && window.deadline >= today
        })
        .or_else(|| windows.iter().find(|window| window.deadline >= today))
        .cloned()
}

fn find_step(conn: &Connection, account_id: &str, step_id: &str) -> AppResult<StepRecord> {
    StepRepository::find_by_id(conn, account_id, step_id)?
        .ok_or_else(AppError::not_found)?
        .into_record()
}

fn list_steps_in(conn: &Connection, account_id: &str, horizon: &Horizon) -> AppResult<Vec<StepRecord>> {
    StepRepository::list_between(
        conn,
        account_id,
        &schedule_utils::format_date(horizon.start),
        &schedule_utils::format_date(horizon.end),
    )?
    .into_iter()
    .map(StepRow::into_record)
    .collect()
}

fn load_free_times(
    conn: &Connection,
    account_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<FreeTimeRecord>> {
    FreeTimeRepository::list_active_between(
        conn,
        account_id,
        &schedule_utils::format_date(from),
        &schedule_utils::format_date(to),
    )?
    .into_iter()
    .map(FreeTimeRow::into_record)
    .collect()
}

fn load_snapshot(conn: &Connection, account_id: &str) -> AppResult<Snapshot> {
    let tasks = TaskRepository::list_for_account(conn, account_id)?
        .into_iter()
        .map(TaskRow::into_record)
        .collect::<AppResult<Vec<_>>>()?;
    let free_times = FreeTimeRepository::list_for_account(conn, account_id)?
        .into_iter()
        .map(FreeTimeRow::into_record)
        .collect::<AppResult<Vec<_>>>()?;
    let steps = StepRepository::list_for_account(conn, account_id)?
        .into_iter()
        .map(StepRow::into_record)
        .collect::<AppResult<Vec<_>>>()?;

    debug!(
        target: "app::planning",
        account_id,
        tasks = tasks.len(),
        free_times = free_times.len(),
        steps = steps.len(),
        "snapshot loaded"
    );

    Ok(Snapshot {
        tasks,
        free_times,
        steps,
    })
}
