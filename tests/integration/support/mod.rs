#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use studyplan_core::commands::AppState;
use studyplan_core::db::DbPool;
use studyplan_core::models::calendar::DayInterval;
use studyplan_core::models::free_time::FreeTimeCreateInput;
use studyplan_core::models::module::ModuleCreateInput;
use studyplan_core::models::step::StepRecord;
use studyplan_core::models::task::{TaskCreateInput, TaskKind, TaskRecord};
use studyplan_core::services::clock::{Clock, FixedClock};
use tempfile::{tempdir, TempDir};

pub const ACCOUNT: &str = "student-1";

/// 2025-03-10 is a Monday.
pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).expect("valid date")
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    date(day).and_time(time(hour, minute))
}

pub fn slot(day: u32, start: (u32, u32), end: (u32, u32)) -> DayInterval {
    DayInterval::new(date(day), time(start.0, start.1), time(end.0, end.1)).expect("valid interval")
}

pub struct Fixture {
    _dir: TempDir,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
}

impl Fixture {
    /// Fresh store with the clock at Monday 2025-03-10 07:00.
    pub fn new() -> Self {
        let dir = tempdir().expect("temp dir");
        let pool = DbPool::new(dir.path().join("planner.sqlite")).expect("db pool");
        let clock = Arc::new(FixedClock::new(at(10, 7, 0)));
        let shared: Arc<dyn Clock> = clock.clone();
        let state = AppState::new(pool, shared);
        Self {
            _dir: dir,
            state,
            clock,
        }
    }

    pub fn module(&self) -> String {
        self.state
            .modules()
            .create_module(
                ACCOUNT,
                ModuleCreateInput {
                    title: "Analysis I".into(),
                    ..Default::default()
                },
            )
            .expect("create module")
            .id
    }

    pub fn task(&self, module_id: &str, title: &str, load: i64, kind: TaskKind) -> TaskRecord {
        self.state
            .tasks()
            .create_task(
                ACCOUNT,
                TaskCreateInput {
                    module_id: module_id.to_string(),
                    title: title.to_string(),
                    weekly_time_load: load,
                    send_notification: false,
                    kind,
                },
            )
            .expect("create task")
    }

    pub fn other_task(&self, module_id: &str, load: i64, start: u32, end: u32) -> TaskRecord {
        self.task(
            module_id,
            "Exercise sheet",
            load,
            TaskKind::Other {
                start: date(start),
                end: date(end),
            },
        )
    }

    pub fn block(&self, day: u32, start: (u32, u32), end: (u32, u32), weekly: bool) {
        self.state
            .free_times()
            .create_free_time(
                ACCOUNT,
                FreeTimeCreateInput {
                    title: "Part-time job".into(),
                    date: date(day),
                    start_time: time(start.0, start.1),
                    end_time: time(end.0, end.1),
                    weekly,
                },
            )
            .expect("create free time");
    }
}

pub fn minutes_for(steps: &[StepRecord], task_id: &str) -> i64 {
    steps
        .iter()
        .filter(|step| step.task_id == task_id)
        .map(StepRecord::planned_minutes)
        .sum()
}

pub fn assert_no_overlap(steps: &[StepRecord]) {
    for (i, a) in steps.iter().enumerate() {
        for b in steps.iter().skip(i + 1) {
            assert!(
                !a.interval.overlaps(&b.interval),
                "steps {} and {} overlap: {:?} / {:?}",
                a.id,
                b.id,
                a.interval,
                b.interval
            );
        }
    }
}
