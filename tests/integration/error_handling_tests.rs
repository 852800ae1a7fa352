mod support;

use studyplan_core::commands::CommandError;
use studyplan_core::error::AppError;
use studyplan_core::models::free_time::FreeTimeCreateInput;
use studyplan_core::models::module::ModuleCreateInput;
use studyplan_core::models::planning::UpdatePlanInput;
use studyplan_core::models::settings::PlannerSettingsUpdate;
use studyplan_core::models::task::{TaskCreateInput, TaskKind};
use support::{date, time, Fixture, ACCOUNT};

#[test]
fn invalid_settings_are_rejected_and_not_stored() {
    let fx = Fixture::new();
    let settings = fx.state.settings();

    let inverted = settings.update(
        ACCOUNT,
        PlannerSettingsUpdate {
            day_start_minute: Some(1200),
            day_end_minute: Some(600),
            ..Default::default()
        },
    );
    assert!(matches!(inverted, Err(AppError::Validation { .. })));

    let no_days = settings.update(
        ACCOUNT,
        PlannerSettingsUpdate {
            study_days: Some(Vec::new()),
            ..Default::default()
        },
    );
    assert!(matches!(no_days, Err(AppError::Validation { .. })));

    let zero_cap = settings.update(
        ACCOUNT,
        PlannerSettingsUpdate {
            max_daily_minutes: Some(Some(0)),
            ..Default::default()
        },
    );
    assert!(matches!(zero_cap, Err(AppError::Validation { .. })));

    let stored = settings.get(ACCOUNT).expect("settings");
    assert_eq!(stored.day_start_minute, 480);
    assert_eq!(stored.day_end_minute, 1320);
    assert_eq!(stored.study_days.len(), 7);
}

#[test]
fn task_for_unknown_module_is_not_found() {
    let fx = Fixture::new();
    let result = fx.state.tasks().create_task(
        ACCOUNT,
        TaskCreateInput {
            module_id: "nope".into(),
            title: "Orphan".into(),
            weekly_time_load: 60,
            send_notification: false,
            kind: TaskKind::Exam { exam_date: date(14) },
        },
    );
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[test]
fn invalid_task_input_is_a_validation_error() {
    let fx = Fixture::new();
    let module = fx.module();
    let tasks = fx.state.tasks();

    let negative = tasks.create_task(
        ACCOUNT,
        TaskCreateInput {
            module_id: module.clone(),
            title: "Negative".into(),
            weekly_time_load: -10,
            send_notification: false,
            kind: TaskKind::Exam { exam_date: date(14) },
        },
    );
    assert!(matches!(negative, Err(AppError::Validation { .. })));

    let blank = tasks.create_task(
        ACCOUNT,
        TaskCreateInput {
            module_id: module,
            title: "   ".into(),
            weekly_time_load: 10,
            send_notification: false,
            kind: TaskKind::Other { start: date(10), end: date(12) },
        },
    );
    assert!(matches!(blank, Err(AppError::Validation { .. })));
}

#[test]
fn invalid_free_time_and_module_input_are_validation_errors() {
    let fx = Fixture::new();

    let empty = fx.state.free_times().create_free_time(
        ACCOUNT,
        FreeTimeCreateInput {
            title: "Lecture".into(),
            date: date(10),
            start_time: time(10, 0),
            end_time: time(10, 0),
            weekly: true,
        },
    );
    assert!(matches!(empty, Err(AppError::Validation { .. })));

    let bad_color = fx.state.modules().create_module(
        ACCOUNT,
        ModuleCreateInput {
            title: "Physics".into(),
            color: Some("blue".into()),
            ..Default::default()
        },
    );
    assert!(matches!(bad_color, Err(AppError::Validation { .. })));
}

#[test]
fn accounts_do_not_see_each_other() {
    let fx = Fixture::new();
    let module = fx.module();
    let task = fx.other_task(&module, 60, 10, 16);
    let step = fx
        .state
        .planning()
        .update_plan(ACCOUNT, UpdatePlanInput::default())
        .expect("plan")
        .steps
        .remove(0);

    assert!(matches!(
        fx.state.tasks().get_task("intruder", &task.id),
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        fx.state.planning().get_step("intruder", &step.id),
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        fx.state.modules().delete_module("intruder", &module),
        Err(AppError::NotFound)
    ));

    let other_plan = fx
        .state
        .planning()
        .update_plan("intruder", UpdatePlanInput::default())
        .expect("empty plan");
    assert!(other_plan.steps.is_empty());
    assert!(fx.state.planning().get_step(ACCOUNT, &step.id).is_ok());
}

#[test]
fn app_errors_map_to_stable_command_codes() {
    let cases = [
        (AppError::validation("bad"), "VALIDATION_ERROR"),
        (AppError::not_found(), "NOT_FOUND"),
        (AppError::conflict("taken"), "CONFLICT"),
        (AppError::invalid_state("rated"), "INVALID_STATE"),
        (AppError::no_availability("full"), "NO_AVAILABILITY"),
        (AppError::cancelled(), "CANCELLED"),
        (AppError::other("boom"), "UNKNOWN"),
    ];
    for (error, code) in cases {
        assert_eq!(CommandError::from(error).code, code);
    }

    let details = CommandError::from(AppError::validation_with_details(
        "too long",
        serde_json::json!({"field": "title"}),
    ));
    assert_eq!(details.details, Some(serde_json::json!({"field": "title"})));
}
