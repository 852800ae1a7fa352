use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::db::repositories::module_repository::ModuleRepository;
use crate::db::repositories::task_repository::{TaskRepository, TaskRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::task::{TaskCreateInput, TaskKind, TaskRecord, TaskUpdateInput};
use crate::services::account_lock::AccountLocks;

const MAX_TITLE_CHARS: usize = 160;

#[derive(Clone)]
pub struct TaskService {
    db: DbPool,
    locks: Arc<AccountLocks>,
}

impl TaskService {
    pub fn new(db: DbPool, locks: Arc<AccountLocks>) -> Self {
        Self { db, locks }
    }

    pub fn create_task(&self, account_id: &str, input: TaskCreateInput) -> AppResult<TaskRecord> {
        let now = Utc::now().to_rfc3339();
        let record = TaskRecord {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            module_id: input.module_id,
            title: normalize_title(&input.title)?,
            weekly_time_load: input.weekly_time_load,
            send_notification: input.send_notification,
            kind: input.kind,
            created_at: now.clone(),
            updated_at: now,
        };
        validate_record(&record)?;

        let row = TaskRow::from_record(&record);
        self.db.with_connection(|conn| {
            ensure_module(conn, account_id, &record.module_id)?;
            TaskRepository::insert(conn, &row)
        })?;
        info!(
            target: "app::planning",
            account_id,
            task_id = %record.id,
            kind = record.kind.label(),
            "task created"
        );
        Ok(record)
    }

    pub fn update_task(&self, account_id: &str, id: &str, update: TaskUpdateInput) -> AppResult<TaskRecord> {
        let mut existing = self.get_task(account_id, id)?;

        if let Some(module_id) = update.module_id {
            existing.module_id = module_id;
        }
        if let Some(title) = update.title {
            existing.title = normalize_title(&title)?;
        }
        if let Some(load) = update.weekly_time_load {
            existing.weekly_time_load = load;
        }
        if let Some(flag) = update.send_notification {
            existing.send_notification = flag;
        }
        if let Some(kind) = update.kind {
            existing.kind = kind;
        }
        existing.updated_at = Utc::now().to_rfc3339();
        validate_record(&existing)?;

        let row = TaskRow::from_record(&existing);
        self.db.with_connection(|conn| {
            ensure_module(conn, account_id, &existing.module_id)?;
            TaskRepository::update(conn, &row)
        })?;
        info!(target: "app::planning", account_id, task_id = %id, "task updated");
        Ok(existing)
    }

    /// Deletes the task; its steps go with it.
    pub fn delete_task(&self, account_id: &str, id: &str) -> AppResult<()> {
        self.locks.with_write(account_id, || {
            self.db
                .with_connection(|conn| TaskRepository::delete(conn, account_id, id))
        })?;
        info!(target: "app::planning", account_id, task_id = %id, "task deleted");
        Ok(())
    }

    pub fn get_task(&self, account_id: &str, id: &str) -> AppResult<TaskRecord> {
        let row = self
            .db
            .with_connection(|conn| TaskRepository::find_by_id(conn, account_id, id))?
            .ok_or_else(AppError::not_found)?;
        let record = row.into_record()?;
        debug!(target: "app::planning", task_id = %record.id, "task fetched");
        Ok(record)
    }

    pub fn list_tasks(&self, account_id: &str) -> AppResult<Vec<TaskRecord>> {
        let rows = self
            .db
            .with_connection(|conn| TaskRepository::list_for_account(conn, account_id))?;
        let tasks = rows
            .into_iter()
            .map(TaskRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::planning", account_id, count = tasks.len(), "tasks listed");
        Ok(tasks)
    }

    pub fn list_tasks_for_module(&self, account_id: &str, module_id: &str) -> AppResult<Vec<TaskRecord>> {
        let rows = self.db.with_connection(|conn| {
            ensure_module(conn, account_id, module_id)?;
            TaskRepository::list_for_module(conn, account_id, module_id)
        })?;
        rows.into_iter().map(TaskRow::into_record).collect()
    }
}

fn ensure_module(conn: &rusqlite::Connection, account_id: &str, module_id: &str) -> AppResult<()> {
    ModuleRepository::find_by_id(conn, account_id, module_id)?
        .map(|_| ())
        .ok_or_else(AppError::not_found)
}

pub fn validate_record(record: &TaskRecord) -> AppResult<()> {
    if record.weekly_time_load < 0 {
        return Err(AppError::validation_with_details(
            "weekly time load must not be negative",
            json!({"weeklyTimeLoad": record.weekly_time_load}),
        ));
    }

    match &record.kind {
        TaskKind::Exam { .. } => {}
        TaskKind::Submission {
            first_date,
            cycle,
            last_date,
        } => {
            if *cycle < 1 {
                return Err(AppError::validation_with_details(
                    "submission cycle must be at least one week",
                    json!({"cycle": cycle}),
                ));
            }
            if let Some(last) = last_date {
                if *last < first_date.date() {
                    return Err(AppError::validation(
                        "submission last date must not precede its first date",
                    ));
                }
            }
        }
        TaskKind::Other { start, end } => {
            if end < start {
                return Err(AppError::validation_with_details(
                    "task range end must not precede its start",
                    json!({"start": start.to_string(), "end": end.to_string()}),
                ));
            }
        }
    }

    Ok(())
}

pub(crate) fn normalize_title(title: &str) -> AppResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::validation("title must be at most 160 characters"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
