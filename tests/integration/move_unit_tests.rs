mod support;

use chrono::Duration;
use studyplan_core::error::AppError;
use studyplan_core::models::planning::{MoveUnitInput, UpdatePlanInput};
use studyplan_core::models::settings::PlannerSettingsUpdate;
use studyplan_core::models::step::{MarkFinishedInput, StepRecord};
use studyplan_core::models::task::TaskKind;
use support::{at, date, slot, time, Fixture, ACCOUNT};

fn planned(fx: &Fixture) -> Vec<StepRecord> {
    fx.state
        .planning()
        .update_plan(ACCOUNT, UpdatePlanInput::default())
        .expect("update plan")
        .steps
}

fn move_to(day: u32, start: (u32, u32), step: &StepRecord) -> MoveUnitInput {
    MoveUnitInput {
        step_id: step.id.clone(),
        date: date(day),
        start: time(start.0, start.1),
        end: None,
    }
}

#[test]
fn moving_to_the_current_slot_changes_nothing() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);

    let moved = fx
        .state
        .planning()
        .move_unit(ACCOUNT, move_to(10, (8, 0), &step))
        .expect("move");
    assert_eq!(moved, step);
}

#[test]
fn moving_keeps_the_planned_duration() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);

    let moved = fx
        .state
        .planning()
        .move_unit(ACCOUNT, move_to(12, (14, 0), &step))
        .expect("move");
    assert_eq!(moved.interval, slot(12, (14, 0), (15, 0)));

    let stored = fx.state.planning().get_step(ACCOUNT, &step.id).expect("step");
    assert_eq!(stored.interval, moved.interval);
}

#[test]
fn explicit_end_resizes_the_unit() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);

    let moved = fx
        .state
        .planning()
        .move_unit(
            ACCOUNT,
            MoveUnitInput {
                end: Some(time(16, 30)),
                ..move_to(12, (15, 0), &step)
            },
        )
        .expect("move");
    assert_eq!(moved.planned_minutes(), 90);
}

#[test]
fn moving_onto_another_unit_conflicts() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.task(&module, "Early", 60, TaskKind::Exam { exam_date: date(12) });
    fx.task(&module, "Late", 60, TaskKind::Exam { exam_date: date(13) });
    let steps = planned(&fx);
    assert_eq!(steps.len(), 2);
    let first = &steps[0];
    assert_eq!(first.interval, slot(10, (8, 0), (9, 0)));
    assert_eq!(steps[1].interval, slot(10, (9, 0), (10, 0)));

    let result = fx.state.planning().move_unit(ACCOUNT, move_to(10, (9, 30), first));
    assert!(matches!(result, Err(AppError::Conflict { .. })));

    let unchanged = fx.state.planning().get_step(ACCOUNT, &first.id).expect("step");
    assert_eq!(unchanged.interval, first.interval);
}

#[test]
fn moving_outside_the_day_window_conflicts() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);
    let planning = fx.state.planning();

    let late = planning.move_unit(ACCOUNT, move_to(11, (21, 30), &step));
    assert!(matches!(late, Err(AppError::Conflict { .. })));

    let early = planning.move_unit(ACCOUNT, move_to(11, (7, 0), &step));
    assert!(matches!(early, Err(AppError::Conflict { .. })));

    let past_midnight = planning.move_unit(ACCOUNT, move_to(11, (23, 30), &step));
    assert!(matches!(past_midnight, Err(AppError::Validation { .. })));
}

#[test]
fn moving_onto_free_time_conflicts() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);
    fx.block(12, (14, 0), (16, 0), false);

    let result = fx.state.planning().move_unit(ACCOUNT, move_to(12, (15, 0), &step));
    assert!(matches!(result, Err(AppError::Conflict { .. })));
}

#[test]
fn moving_into_the_past_conflicts() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);

    fx.clock.set(at(11, 12, 0));
    let result = fx.state.planning().move_unit(ACCOUNT, move_to(11, (9, 0), &step));
    assert!(matches!(result, Err(AppError::Conflict { .. })));
}

#[test]
fn finished_units_cannot_be_moved() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);

    fx.state
        .rating()
        .mark_unit_finished(
            ACCOUNT,
            MarkFinishedInput {
                step_id: step.id.clone(),
                actual_minutes: 60,
            },
        )
        .expect("finish");

    let manual = fx.state.planning().move_unit(ACCOUNT, move_to(12, (14, 0), &step));
    assert!(matches!(manual, Err(AppError::InvalidState { .. })));
    let automatic = fx.state.planning().move_unit_automatically(ACCOUNT, &step.id);
    assert!(matches!(automatic, Err(AppError::InvalidState { .. })));
}

#[test]
fn unknown_unit_is_not_found() {
    let fx = Fixture::new();
    let result = fx.state.planning().move_unit_automatically(ACCOUNT, "missing");
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[test]
fn automatic_move_skips_the_current_slot() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);
    assert_eq!(step.interval, slot(10, (8, 0), (9, 0)));

    let moved = fx
        .state
        .planning()
        .move_unit_automatically(ACCOUNT, &step.id)
        .expect("auto move");
    assert_eq!(moved.interval, slot(10, (9, 0), (10, 0)));
}

#[test]
fn automatic_move_falls_back_to_the_current_slot_when_nothing_else_fits() {
    let fx = Fixture::new();
    fx.state
        .settings()
        .update(
            ACCOUNT,
            PlannerSettingsUpdate {
                day_end_minute: Some(9 * 60),
                ..Default::default()
            },
        )
        .expect("narrow the day");
    let module = fx.module();
    fx.task(&module, "Oral exam", 60, TaskKind::Exam { exam_date: date(10) });
    let step = planned(&fx).remove(0);
    assert_eq!(step.interval, slot(10, (8, 0), (9, 0)));

    let kept = fx
        .state
        .planning()
        .move_unit_automatically(ACCOUNT, &step.id)
        .expect("auto move");
    assert_eq!(kept, step);
}

#[test]
fn automatic_move_without_room_before_the_deadline_leaves_the_unit() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.task(&module, "Oral exam", 60, TaskKind::Exam { exam_date: date(11) });
    let step = planned(&fx).remove(0);

    // Only 30 minutes of the deadline day remain.
    fx.clock.set(at(11, 21, 30));
    let result = fx.state.planning().move_unit_automatically(ACCOUNT, &step.id);
    assert!(matches!(result, Err(AppError::NoAvailability { .. })));
    let unchanged = fx.state.planning().get_step(ACCOUNT, &step.id).expect("step");
    assert_eq!(unchanged, step);

    // Deadline passed entirely.
    fx.clock.advance(Duration::hours(12));
    let result = fx.state.planning().move_unit_automatically(ACCOUNT, &step.id);
    assert!(matches!(result, Err(AppError::NoAvailability { .. })));
    let unchanged = fx.state.planning().get_step(ACCOUNT, &step.id).expect("step");
    assert_eq!(unchanged, step);
}
