mod support;

use std::time::Duration as StdDuration;

use studyplan_core::commands::{free_time, planning, rating, settings, task};
use studyplan_core::models::free_time::FreeTimeCreateInput;
use studyplan_core::models::module::ModuleCreateInput;
use studyplan_core::models::planning::{MoveUnitInput, UpdatePlanInput};
use studyplan_core::models::settings::PlannerSettingsUpdate;
use studyplan_core::models::step::{MarkFinishedInput, StepStatus};
use studyplan_core::models::task::{TaskCreateInput, TaskKind};
use studyplan_core::services::account_lock::PlanCancellation;
use support::{at, date, slot, time, Fixture, ACCOUNT};

#[tokio::test]
async fn planner_round_trip_through_commands() {
    let fx = Fixture::new();
    let state = &fx.state;

    let module = task::modules_create(
        state,
        ACCOUNT.into(),
        ModuleCreateInput {
            title: "Statistics".into(),
            ..Default::default()
        },
    )
    .await
    .expect("module");

    let created = task::tasks_create(
        state,
        ACCOUNT.into(),
        TaskCreateInput {
            module_id: module.id.clone(),
            title: "Problem set".into(),
            weekly_time_load: 90,
            send_notification: true,
            kind: TaskKind::Other {
                start: date(10),
                end: date(16),
            },
        },
    )
    .await
    .expect("task");

    free_time::free_times_create(
        state,
        ACCOUNT.into(),
        FreeTimeCreateInput {
            title: "Football".into(),
            date: date(10),
            start_time: time(8, 0),
            end_time: time(9, 0),
            weekly: true,
        },
    )
    .await
    .expect("free time");

    let outcome = planning::planning_update(state, ACCOUNT.into(), UpdatePlanInput::default())
        .await
        .expect("plan");
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].task_id, created.id);
    assert_eq!(outcome.steps[0].interval, slot(10, (9, 0), (10, 30)));

    let step_id = outcome.steps[0].id.clone();
    let moved = planning::planning_move_unit(
        state,
        ACCOUNT.into(),
        MoveUnitInput {
            step_id: step_id.clone(),
            date: date(12),
            start: time(18, 0),
            end: None,
        },
    )
    .await
    .expect("move");
    assert_eq!(moved.interval, slot(12, (18, 0), (19, 30)));

    let view = planning::planning_view(state, ACCOUNT.into(), None)
        .await
        .expect("view");
    assert_eq!(view.days[2].steps.len(), 1);

    let finished = rating::steps_mark_finished(
        state,
        ACCOUNT.into(),
        MarkFinishedInput {
            step_id: step_id.clone(),
            actual_minutes: 80,
        },
    )
    .await
    .expect("finish");
    assert_eq!(finished.status, StepStatus::Finished);

    fx.clock.set(at(12, 20, 0));
    let rateable = rating::steps_list_rateable(state, ACCOUNT.into())
        .await
        .expect("rateable");
    assert_eq!(rateable, vec![step_id]);

    let tasks = task::tasks_list(state, ACCOUNT.into(), Some(module.id.clone()))
        .await
        .expect("tasks");
    assert_eq!(tasks.len(), 1);

    task::modules_delete(state, ACCOUNT.into(), module.id)
        .await
        .expect("delete module");
    let remaining = task::tasks_list(state, ACCOUNT.into(), None).await.expect("tasks");
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn command_errors_carry_codes() {
    let fx = Fixture::new();
    let state = &fx.state;

    let missing = planning::planning_move_unit_automatically(state, ACCOUNT.into(), "nope".into())
        .await
        .expect_err("unknown step");
    assert_eq!(missing.code, "NOT_FOUND");

    let invalid = settings::settings_update(
        state,
        ACCOUNT.into(),
        PlannerSettingsUpdate {
            min_unit_minutes: Some(-1),
            ..Default::default()
        },
    )
    .await
    .expect_err("negative minimum");
    assert_eq!(invalid.code, "VALIDATION_ERROR");

    let cancel = PlanCancellation::new();
    cancel.cancel();
    let cancelled = planning::planning_update_cancellable(
        state,
        ACCOUNT.into(),
        UpdatePlanInput::default(),
        cancel,
    )
    .await
    .expect_err("cancelled");
    assert_eq!(cancelled.code, "CANCELLED");
}

#[tokio::test]
async fn settings_reset_restores_defaults() {
    let fx = Fixture::new();
    let state = &fx.state;

    let updated = settings::settings_update(
        state,
        ACCOUNT.into(),
        PlannerSettingsUpdate {
            break_minutes: Some(15),
            ..Default::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(updated.break_minutes, 15);

    let reset = settings::settings_reset(state, ACCOUNT.into()).await.expect("reset");
    assert_eq!(reset.break_minutes, 0);
    let fetched = settings::settings_get(state, ACCOUNT.into()).await.expect("get");
    assert_eq!(fetched.break_minutes, 0);
}

#[tokio::test]
async fn missed_unit_is_replanned_through_commands() {
    let fx = Fixture::new();
    let state = &fx.state;
    let module = fx.module();
    let task = fx.other_task(&module, 60, 10, 16);

    let outcome = planning::planning_update(state, ACCOUNT.into(), UpdatePlanInput::default())
        .await
        .expect("plan");
    let step_id = outcome.steps[0].id.clone();

    let missed = rating::steps_mark_missed(state, ACCOUNT.into(), step_id.clone())
        .await
        .expect("mark missed");
    assert_eq!(missed.status, StepStatus::Missed);

    let again = rating::steps_mark_missed(state, ACCOUNT.into(), step_id.clone())
        .await
        .expect_err("already missed");
    assert_eq!(again.code, "INVALID_STATE");

    let replanned = planning::planning_update(state, ACCOUNT.into(), UpdatePlanInput::default())
        .await
        .expect("replan");
    let scheduled = replanned
        .steps
        .iter()
        .filter(|step| step.status == StepStatus::Scheduled && step.task_id == task.id)
        .collect::<Vec<_>>();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].interval, slot(10, (8, 0), (9, 0)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn periodic_sweep_marks_elapsed_units() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = fx
        .state
        .planning()
        .update_plan(ACCOUNT, UpdatePlanInput::default())
        .expect("plan")
        .steps
        .remove(0);

    fx.clock.set(at(12, 12, 0));
    let handle = fx.state.start_missed_sweep(StdDuration::from_millis(20));

    let mut status = StepStatus::Scheduled;
    for _ in 0..50 {
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        status = fx.state.planning().get_step(ACCOUNT, &step.id).expect("step").status;
        if status == StepStatus::Missed {
            break;
        }
    }
    handle.abort();
    assert_eq!(status, StepStatus::Missed);

    let feedback = rating::tasks_feedback(&fx.state, ACCOUNT.into(), step.task_id.clone())
        .await
        .expect("feedback");
    assert_eq!(feedback.missed_steps, 1);
    assert_eq!(feedback.rated_steps, 0);
    assert_eq!(feedback.goal_completion, None);
}
