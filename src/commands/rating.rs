use crate::models::step::{MarkFinishedInput, RateUnitInput, StepRecord, TaskFeedback};

use super::{run_blocking, AppState, CommandResult};

pub async fn steps_mark_finished(
    state: &AppState,
    account_id: String,
    payload: MarkFinishedInput,
) -> CommandResult<StepRecord> {
    let state = state.clone();
    run_blocking(move || state.rating().mark_unit_finished(&account_id, payload)).await
}

pub async fn steps_mark_missed(
    state: &AppState,
    account_id: String,
    step_id: String,
) -> CommandResult<StepRecord> {
    let state = state.clone();
    run_blocking(move || state.rating().rate_unit_missed(&account_id, &step_id)).await
}

pub async fn steps_rate(
    state: &AppState,
    account_id: String,
    payload: RateUnitInput,
) -> CommandResult<StepRecord> {
    let state = state.clone();
    run_blocking(move || state.rating().rate_unit(&account_id, payload)).await
}

pub async fn steps_list_rateable(state: &AppState, account_id: String) -> CommandResult<Vec<String>> {
    let state = state.clone();
    run_blocking(move || state.rating().list_rateable(&account_id)).await
}

pub async fn steps_sweep_missed(state: &AppState, account_id: String) -> CommandResult<Vec<String>> {
    let state = state.clone();
    run_blocking(move || state.rating().sweep_missed_units(&account_id)).await
}

pub async fn tasks_feedback(
    state: &AppState,
    account_id: String,
    task_id: String,
) -> CommandResult<TaskFeedback> {
    let state = state.clone();
    run_blocking(move || state.rating().task_feedback(&account_id, &task_id)).await
}
