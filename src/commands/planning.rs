use crate::models::calendar::Horizon;
use crate::models::planning::{MoveUnitInput, PlanOutcome, PlanView, UpdatePlanInput};
use crate::models::step::StepRecord;
use crate::services::account_lock::PlanCancellation;

use super::{run_blocking, AppState, CommandResult};

pub async fn planning_update(
    state: &AppState,
    account_id: String,
    payload: UpdatePlanInput,
) -> CommandResult<PlanOutcome> {
    let state = state.clone();
    run_blocking(move || {
        let service = state.planning();
        service.update_plan(&account_id, payload)
    })
    .await
}

/// Same as [`planning_update`], but aborts without writing once `cancel` fires.
pub async fn planning_update_cancellable(
    state: &AppState,
    account_id: String,
    payload: UpdatePlanInput,
    cancel: PlanCancellation,
) -> CommandResult<PlanOutcome> {
    let state = state.clone();
    run_blocking(move || {
        let service = state.planning();
        service.update_plan_with_cancel(&account_id, payload, &cancel)
    })
    .await
}

pub async fn planning_move_unit(
    state: &AppState,
    account_id: String,
    payload: MoveUnitInput,
) -> CommandResult<StepRecord> {
    let state = state.clone();
    run_blocking(move || state.planning().move_unit(&account_id, payload)).await
}

pub async fn planning_move_unit_automatically(
    state: &AppState,
    account_id: String,
    step_id: String,
) -> CommandResult<StepRecord> {
    let state = state.clone();
    run_blocking(move || state.planning().move_unit_automatically(&account_id, &step_id)).await
}

pub async fn planning_view(
    state: &AppState,
    account_id: String,
    horizon: Option<Horizon>,
) -> CommandResult<PlanView> {
    let state = state.clone();
    run_blocking(move || state.planning().plan_view(&account_id, horizon)).await
}

pub async fn planning_steps_list(
    state: &AppState,
    account_id: String,
    horizon: Horizon,
) -> CommandResult<Vec<StepRecord>> {
    let state = state.clone();
    run_blocking(move || state.planning().list_steps(&account_id, horizon)).await
}
