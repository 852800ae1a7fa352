use crate::models::free_time::{FreeTimeCreateInput, FreeTimeRecord, FreeTimeUpdateInput};
use crate::services::free_time_service::FreeTimeSaved;

use super::{run_blocking, AppState, CommandResult};

pub async fn free_times_list(state: &AppState, account_id: String) -> CommandResult<Vec<FreeTimeRecord>> {
    let state = state.clone();
    run_blocking(move || state.free_times().list_free_times(&account_id)).await
}

pub async fn free_times_create(
    state: &AppState,
    account_id: String,
    payload: FreeTimeCreateInput,
) -> CommandResult<FreeTimeSaved> {
    let state = state.clone();
    run_blocking(move || state.free_times().create_free_time(&account_id, payload)).await
}

pub async fn free_times_update(
    state: &AppState,
    account_id: String,
    id: String,
    payload: FreeTimeUpdateInput,
) -> CommandResult<FreeTimeSaved> {
    let state = state.clone();
    run_blocking(move || state.free_times().update_free_time(&account_id, &id, payload)).await
}

pub async fn free_times_delete(state: &AppState, account_id: String, id: String) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.free_times().delete_free_time(&account_id, &id)).await
}
