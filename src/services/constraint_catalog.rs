use std::cmp::Ordering;

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::models::calendar::Horizon;
use crate::models::planning::DemandWindow;
use crate::models::step::StepRecord;
use crate::models::task::{TaskKind, TaskRecord};
use crate::services::schedule_utils::MINUTES_PER_DAY;

const DAYS_PER_WEEK: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogRules {
    /// Each deadline moves this many days earlier, never before the window's release.
    pub deadline_buffer_days: i64,
}

/// Translates every task into demand windows for `horizon`, ordered by deadline, then task id,
/// then release.
pub fn windows_for_tasks(
    tasks: &[TaskRecord],
    horizon: &Horizon,
    rules: &CatalogRules,
) -> Vec<DemandWindow> {
    let mut windows = tasks
        .iter()
        .flat_map(|task| demand_windows(task, horizon, rules))
        .collect::<Vec<_>>();
    sort_windows(&mut windows);
    windows
}

pub fn sort_windows(windows: &mut [DemandWindow]) {
    windows.sort_by(compare_windows);
}

pub fn compare_windows(a: &DemandWindow, b: &DemandWindow) -> Ordering {
    a.deadline
        .cmp(&b.deadline)
        .then_with(|| a.task_id.cmp(&b.task_id))
        .then_with(|| a.release.cmp(&b.release))
}

pub fn demand_windows(task: &TaskRecord, horizon: &Horizon, rules: &CatalogRules) -> Vec<DemandWindow> {
    if task.weekly_time_load <= 0 {
        return Vec::new();
    }

    let mut windows = match &task.kind {
        TaskKind::Exam { exam_date } => exam_window(task, *exam_date, horizon, rules)
            .into_iter()
            .collect(),
        TaskKind::Submission {
            first_date,
            cycle,
            last_date,
        } => submission_windows(
            task,
            first_date.date(),
            first_date.time(),
            *cycle,
            *last_date,
            horizon,
            rules,
        ),
        TaskKind::Other { start, end } => other_windows(task, *start, *end, horizon, rules),
    };

    windows.retain(|window| window.required_minutes > 0);
    windows
}

fn exam_window(
    task: &TaskRecord,
    exam_date: NaiveDate,
    horizon: &Horizon,
    rules: &CatalogRules,
) -> Option<DemandWindow> {
    if exam_date < horizon.start {
        return None;
    }

    // The whole remaining load is asked for now; whatever lies past the horizon surfaces as underfill.
    let weeks = ceil_weeks((exam_date - horizon.start).num_days()).max(1);

    Some(DemandWindow {
        task_id: task.id.clone(),
        release: horizon.start,
        deadline: buffered(exam_date, horizon.start, rules),
        required_minutes: task.weekly_time_load * weeks,
    })
}

fn submission_windows(
    task: &TaskRecord,
    first_day: NaiveDate,
    due_time: NaiveTime,
    cycle: u32,
    last_date: Option<NaiveDate>,
    horizon: &Horizon,
    rules: &CatalogRules,
) -> Vec<DemandWindow> {
    let cycle = i64::from(cycle.max(1));
    let period_days = cycle * DAYS_PER_WEEK;
    // A midnight due time means the work has to be finished the day before.
    let first_deadline = if due_time == NaiveTime::MIN {
        first_day - Duration::days(1)
    } else {
        first_day
    };

    let skipped_cycles = ((horizon.start - first_deadline).num_days() / period_days).max(0);
    let mut windows = Vec::new();

    for k in skipped_cycles.. {
        let offset = Duration::days(k * period_days);
        let raw_deadline = first_deadline + offset;
        if let Some(last) = last_date {
            if first_day + offset > last {
                break;
            }
        }

        let release = raw_deadline - Duration::days(period_days - 1);
        if release > horizon.end {
            break;
        }
        if raw_deadline < horizon.start {
            continue;
        }

        let full_load = task.weekly_time_load * cycle;
        let window = if raw_deadline > horizon.end {
            let covered_days = (horizon.end - release.max(horizon.start)).num_days() + 1;
            DemandWindow {
                task_id: task.id.clone(),
                release: release.max(horizon.start),
                deadline: buffered(raw_deadline, release, rules),
                required_minutes: (task.weekly_time_load * ceil_weeks(covered_days)).min(full_load),
            }
        } else {
            DemandWindow {
                task_id: task.id.clone(),
                release,
                deadline: buffered(raw_deadline, release, rules),
                required_minutes: full_load,
            }
        };
        windows.push(window);
    }

    windows
}

fn other_windows(
    task: &TaskRecord,
    start: NaiveDate,
    end: NaiveDate,
    horizon: &Horizon,
    rules: &CatalogRules,
) -> Vec<DemandWindow> {
    if end < start || end < horizon.start || start > horizon.end {
        return Vec::new();
    }

    // Slices partition the overlap of the range and the horizon, not the range itself.
    let first_day = start.max(horizon.start);
    let last_day = end.min(horizon.end);
    let mut windows = Vec::new();

    for j in 0.. {
        let slice_start = first_day + Duration::days(j * DAYS_PER_WEEK);
        if slice_start > last_day {
            break;
        }
        let slice_end = (slice_start + Duration::days(DAYS_PER_WEEK - 1)).min(last_day);

        let slice_minutes = ((slice_end - slice_start).num_days() + 1) * MINUTES_PER_DAY;
        windows.push(DemandWindow {
            task_id: task.id.clone(),
            release: slice_start,
            deadline: buffered(slice_end, slice_start, rules),
            required_minutes: task.weekly_time_load.min(slice_minutes),
        });
    }

    windows
}

/// Subtracts minutes of work that already counts toward a window: finished and rated steps,
/// and scheduled steps that stay in place. Windows that end up satisfied are dropped.
pub fn credit_existing(windows: &mut Vec<DemandWindow>, steps: &[StepRecord]) {
    for step in steps {
        let credit = step.credited_minutes();
        if credit <= 0 {
            continue;
        }
        let date = step.interval.date;
        if let Some(window) = windows.iter_mut().find(|window| {
            window.task_id == step.task_id && window.release <= date && date <= window.deadline
        }) {
            window.required_minutes -= credit;
        }
    }
    windows.retain(|window| window.required_minutes > 0);
}

fn buffered(deadline: NaiveDate, floor: NaiveDate, rules: &CatalogRules) -> NaiveDate {
    (deadline - Duration::days(rules.deadline_buffer_days.max(0))).max(floor)
}

fn ceil_weeks(days: i64) -> i64 {
    (days + DAYS_PER_WEEK - 1) / DAYS_PER_WEEK
}
