use crate::models::settings::{PlannerSettings, PlannerSettingsUpdate};

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState, account_id: String) -> CommandResult<PlannerSettings> {
    let app_state = state.clone();
    run_blocking(move || app_state.settings().get(&account_id)).await
}

pub async fn settings_update(
    state: &AppState,
    account_id: String,
    payload: PlannerSettingsUpdate,
) -> CommandResult<PlannerSettings> {
    let app_state = state.clone();
    run_blocking(move || app_state.settings().update(&account_id, payload)).await
}

pub async fn settings_reset(state: &AppState, account_id: String) -> CommandResult<PlannerSettings> {
    let app_state = state.clone();
    run_blocking(move || app_state.settings().reset(&account_id)).await
}
