mod support;

use studyplan_core::error::AppError;
use studyplan_core::models::planning::UpdatePlanInput;
use studyplan_core::models::settings::PlannerSettingsUpdate;
use studyplan_core::models::step::{
    MarkFinishedInput, RateUnitInput, RatingLevel, StepRecord, StepStatus, UnitRatings,
};
use studyplan_core::models::module::ModuleCreateInput;
use studyplan_core::models::task::{TaskCreateInput, TaskKind};
use support::{at, date, slot, Fixture, ACCOUNT};

fn planned(fx: &Fixture) -> Vec<StepRecord> {
    fx.state
        .planning()
        .update_plan(ACCOUNT, UpdatePlanInput::default())
        .expect("update plan")
        .steps
}

fn ratings(goal: RatingLevel, duration: RatingLevel, focus: RatingLevel) -> UnitRatings {
    UnitRatings {
        goal_completion: goal,
        perceived_duration: duration,
        concentration: focus,
    }
}

fn finish(fx: &Fixture, step_id: &str, minutes: i64) -> StepRecord {
    fx.state
        .rating()
        .mark_unit_finished(
            ACCOUNT,
            MarkFinishedInput {
                step_id: step_id.to_string(),
                actual_minutes: minutes,
            },
        )
        .expect("finish")
}

#[test]
fn rating_a_scheduled_unit_is_rejected() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);

    let result = fx.state.rating().rate_unit(
        ACCOUNT,
        RateUnitInput {
            step_id: step.id.clone(),
            ratings: ratings(RatingLevel::High, RatingLevel::Medium, RatingLevel::High),
        },
    );
    assert!(matches!(result, Err(AppError::InvalidState { .. })));

    let stored = fx.state.planning().get_step(ACCOUNT, &step.id).expect("step");
    assert_eq!(stored, step);
}

#[test]
fn finish_then_rate_walks_the_lifecycle() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);
    let rating = fx.state.rating();

    let finished = finish(&fx, &step.id, 50);
    assert_eq!(finished.status, StepStatus::Finished);
    assert_eq!(finished.actual_minutes, Some(50));

    // Not over yet at 07:00.
    assert!(rating.list_rateable(ACCOUNT).expect("rateable").is_empty());
    fx.clock.set(at(10, 9, 30));
    assert_eq!(rating.list_rateable(ACCOUNT).expect("rateable"), vec![step.id.clone()]);

    let given = ratings(RatingLevel::Highest, RatingLevel::Low, RatingLevel::Medium);
    let rated = rating
        .rate_unit(
            ACCOUNT,
            RateUnitInput {
                step_id: step.id.clone(),
                ratings: given,
            },
        )
        .expect("rate");
    assert_eq!(rated.status, StepStatus::Rated);
    assert_eq!(rated.ratings, Some(given));

    let stored = fx.state.planning().get_step(ACCOUNT, &step.id).expect("step");
    assert_eq!(stored.ratings, Some(given));
    assert!(rating.list_rateable(ACCOUNT).expect("rateable").is_empty());

    let again = rating.rate_unit(
        ACCOUNT,
        RateUnitInput {
            step_id: step.id.clone(),
            ratings: given,
        },
    );
    assert!(matches!(again, Err(AppError::InvalidState { .. })));
    let missed = rating.rate_unit_missed(ACCOUNT, &step.id);
    assert!(matches!(missed, Err(AppError::InvalidState { .. })));
}

#[test]
fn negative_actual_duration_is_rejected() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);

    let result = fx.state.rating().mark_unit_finished(
        ACCOUNT,
        MarkFinishedInput {
            step_id: step.id,
            actual_minutes: -5,
        },
    );
    assert!(matches!(result, Err(AppError::Validation { .. })));
}

#[test]
fn sweep_marks_units_missed_after_the_grace_period() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);
    let rating = fx.state.rating();

    fx.clock.set(at(11, 8, 30));
    assert!(rating.sweep_missed_units(ACCOUNT).expect("sweep").is_empty());

    fx.clock.set(at(11, 9, 0));
    assert_eq!(rating.sweep_all_accounts().expect("sweep all"), 1);
    let stored = fx.state.planning().get_step(ACCOUNT, &step.id).expect("step");
    assert_eq!(stored.status, StepStatus::Missed);

    // Missed work is not credited, so the next replan puts it back.
    let outcome = fx
        .state
        .planning()
        .update_plan(ACCOUNT, UpdatePlanInput::default())
        .expect("replan");
    let scheduled = outcome
        .steps
        .iter()
        .filter(|step| step.status == StepStatus::Scheduled)
        .collect::<Vec<_>>();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].interval, slot(11, (9, 0), (10, 0)));
}

#[test]
fn shorter_grace_period_is_honoured() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    planned(&fx);
    fx.state
        .settings()
        .update(
            ACCOUNT,
            PlannerSettingsUpdate {
                missed_grace_minutes: Some(30),
                ..Default::default()
            },
        )
        .expect("settings");

    fx.clock.set(at(10, 9, 30));
    assert_eq!(fx.state.rating().sweep_missed_units(ACCOUNT).expect("sweep").len(), 1);
}

#[test]
fn feedback_averages_rated_units() {
    let fx = Fixture::new();
    let module = fx.module();
    let task = fx.other_task(&module, 120, 10, 16);
    fx.state
        .settings()
        .update(
            ACCOUNT,
            PlannerSettingsUpdate {
                max_unit_minutes: Some(Some(60)),
                ..Default::default()
            },
        )
        .expect("settings");
    let steps = planned(&fx);
    assert_eq!(steps.len(), 2);

    let rating = fx.state.rating();
    let scores = [
        ratings(RatingLevel::High, RatingLevel::Medium, RatingLevel::Low),
        ratings(RatingLevel::Highest, RatingLevel::Low, RatingLevel::Low),
    ];
    for (step, given) in steps.iter().zip(scores) {
        finish(&fx, &step.id, 60);
        rating
            .rate_unit(
                ACCOUNT,
                RateUnitInput {
                    step_id: step.id.clone(),
                    ratings: given,
                },
            )
            .expect("rate");
    }

    let feedback = rating.task_feedback(ACCOUNT, &task.id).expect("feedback");
    assert_eq!(feedback.rated_steps, 2);
    assert_eq!(feedback.missed_steps, 0);
    assert_eq!(feedback.goal_completion, Some(4.5));
    assert_eq!(feedback.perceived_duration, Some(2.5));
    assert_eq!(feedback.concentration, Some(2.0));
}

#[test]
fn missed_unit_frees_its_slot_and_minutes_for_the_next_replan() {
    let fx = Fixture::new();
    let module = fx.module();
    let task = fx.other_task(&module, 120, 10, 16);
    fx.state
        .settings()
        .update(
            ACCOUNT,
            PlannerSettingsUpdate {
                max_unit_minutes: Some(Some(60)),
                ..Default::default()
            },
        )
        .expect("settings");
    let steps = planned(&fx);
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].interval, slot(10, (8, 0), (9, 0)));

    let missed = fx
        .state
        .rating()
        .rate_unit_missed(ACCOUNT, &steps[0].id)
        .expect("mark missed");
    assert_eq!(missed.status, StepStatus::Missed);

    let replanned = planned(&fx);
    let scheduled = replanned
        .iter()
        .filter(|step| step.status == StepStatus::Scheduled && step.task_id == task.id)
        .collect::<Vec<_>>();
    assert_eq!(scheduled.iter().map(|step| step.planned_minutes()).sum::<i64>(), 120);
    assert!(scheduled
        .iter()
        .any(|step| step.interval == slot(10, (8, 0), (9, 0))));

    let kept = fx.state.planning().get_step(ACCOUNT, &steps[0].id).expect("missed step");
    assert_eq!(kept.status, StepStatus::Missed);
}

#[test]
fn sweep_of_all_accounts_survives_one_broken_account() {
    let fx = Fixture::new();
    let module = fx.module();
    fx.other_task(&module, 60, 10, 16);
    let step = planned(&fx).remove(0);

    let broken = "a-broken";
    let broken_module = fx
        .state
        .modules()
        .create_module(
            broken,
            ModuleCreateInput {
                title: "Linear Algebra".into(),
                ..Default::default()
            },
        )
        .expect("module");
    let broken_task = fx
        .state
        .tasks()
        .create_task(
            broken,
            TaskCreateInput {
                module_id: broken_module.id,
                title: "Sheet".into(),
                weekly_time_load: 60,
                send_notification: false,
                kind: TaskKind::Other {
                    start: date(10),
                    end: date(16),
                },
            },
        )
        .expect("task");
    fx.state
        .db()
        .with_connection(|conn| {
            conn.execute(
                "INSERT INTO steps (id, account_id, task_id, date, start_time, end_time, status, created_at, updated_at)
                 VALUES ('garbled', ?1, ?2, '2025-03-10', 'half past eight', '09:00', 'scheduled', '', '')",
                [broken, broken_task.id.as_str()],
            )?;
            Ok(())
        })
        .expect("insert garbled step");

    fx.clock.set(at(11, 9, 0));
    assert_eq!(fx.state.rating().sweep_all_accounts().expect("sweep all"), 1);
    let stored = fx.state.planning().get_step(ACCOUNT, &step.id).expect("step");
    assert_eq!(stored.status, StepStatus::Missed);
}
