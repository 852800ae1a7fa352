use crate::models::module::{ModuleCreateInput, ModuleRecord, ModuleUpdateInput};
use crate::models::task::{TaskCreateInput, TaskRecord, TaskUpdateInput};

use super::{run_blocking, AppState, CommandResult};

pub async fn modules_list(state: &AppState, account_id: String) -> CommandResult<Vec<ModuleRecord>> {
    let state = state.clone();
    run_blocking(move || state.modules().list_modules(&account_id)).await
}

pub async fn modules_create(
    state: &AppState,
    account_id: String,
    payload: ModuleCreateInput,
) -> CommandResult<ModuleRecord> {
    let state = state.clone();
    run_blocking(move || state.modules().create_module(&account_id, payload)).await
}

pub async fn modules_update(
    state: &AppState,
    account_id: String,
    id: String,
    payload: ModuleUpdateInput,
) -> CommandResult<ModuleRecord> {
    let state = state.clone();
    run_blocking(move || state.modules().update_module(&account_id, &id, payload)).await
}

pub async fn modules_delete(state: &AppState, account_id: String, id: String) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.modules().delete_module(&account_id, &id)).await
}

pub async fn tasks_list(
    state: &AppState,
    account_id: String,
    module_id: Option<String>,
) -> CommandResult<Vec<TaskRecord>> {
    let state = state.clone();
    run_blocking(move || {
        let service = state.tasks();
        match module_id {
            Some(module_id) => service.list_tasks_for_module(&account_id, &module_id),
            None => service.list_tasks(&account_id),
        }
    })
    .await
}

pub async fn tasks_get(state: &AppState, account_id: String, id: String) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().get_task(&account_id, &id)).await
}

pub async fn tasks_create(
    state: &AppState,
    account_id: String,
    payload: TaskCreateInput,
) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().create_task(&account_id, payload)).await
}

pub async fn tasks_update(
    state: &AppState,
    account_id: String,
    id: String,
    payload: TaskUpdateInput,
) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().update_task(&account_id, &id, payload)).await
}

pub async fn tasks_delete(state: &AppState, account_id: String, id: String) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.tasks().delete_task(&account_id, &id)).await
}
