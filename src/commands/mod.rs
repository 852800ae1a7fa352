pub mod free_time;
pub mod planning;
pub mod rating;
pub mod settings;
pub mod task;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::db::DbPool;
use crate::error::AppError;
use crate::services::account_lock::AccountLocks;
use crate::services::clock::Clock;
use crate::services::free_time_service::FreeTimeService;
use crate::services::module_service::ModuleService;
use crate::services::planning_service::PlanningService;
use crate::services::rating_service::{self, RatingService};
use crate::services::settings_service::SettingsService;
use crate::services::task_service::TaskService;

/// Shared handle every command works against. Cloning is cheap; all services sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    locks: Arc<AccountLocks>,
    clock: Arc<dyn Clock>,
    settings_service: Arc<SettingsService>,
    module_service: Arc<ModuleService>,
    task_service: Arc<TaskService>,
    free_time_service: Arc<FreeTimeService>,
    planning_service: Arc<PlanningService>,
    rating_service: Arc<RatingService>,
}

impl AppState {
    pub fn new(db_pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        let locks = Arc::new(AccountLocks::new());
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        let module_service = Arc::new(ModuleService::new(db_pool.clone(), Arc::clone(&locks)));
        let task_service = Arc::new(TaskService::new(db_pool.clone(), Arc::clone(&locks)));
        let free_time_service = Arc::new(FreeTimeService::new(db_pool.clone(), Arc::clone(&locks)));
        let planning_service = Arc::new(PlanningService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&locks),
            Arc::clone(&clock),
        ));
        let rating_service = Arc::new(RatingService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&locks),
            Arc::clone(&clock),
        ));

        Self {
            db_pool,
            locks,
            clock,
            settings_service,
            module_service,
            task_service,
            free_time_service,
            planning_service,
            rating_service,
        }
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    pub fn locks(&self) -> Arc<AccountLocks> {
        Arc::clone(&self.locks)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn modules(&self) -> Arc<ModuleService> {
        Arc::clone(&self.module_service)
    }

    pub fn tasks(&self) -> Arc<TaskService> {
        Arc::clone(&self.task_service)
    }

    pub fn free_times(&self) -> Arc<FreeTimeService> {
        Arc::clone(&self.free_time_service)
    }

    pub fn planning(&self) -> Arc<PlanningService> {
        Arc::clone(&self.planning_service)
    }

    pub fn rating(&self) -> Arc<RatingService> {
        Arc::clone(&self.rating_service)
    }

    /// Starts the periodic missed-unit sweep on the current tokio runtime.
    pub fn start_missed_sweep(&self, period: StdDuration) -> JoinHandle<()> {
        rating_service::spawn_missed_sweep(self.rating(), period)
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => {
                warn!(target: "app::command", %message, "validation error in command");
                CommandError::new("VALIDATION_ERROR", message, details)
            }
            AppError::NotFound => {
                warn!(target: "app::command", "resource not found in command");
                CommandError::new("NOT_FOUND", "record not found", None)
            }
            AppError::Conflict { message } => {
                warn!(target: "app::command", %message, "conflict in command");
                CommandError::new("CONFLICT", message, None)
            }
            AppError::InvalidState { message } => {
                warn!(target: "app::command", %message, "invalid state transition in command");
                CommandError::new("INVALID_STATE", message, None)
            }
            AppError::NoAvailability { message } => {
                warn!(target: "app::command", %message, "no availability in command");
                CommandError::new("NO_AVAILABILITY", message, None)
            }
            AppError::Cancelled => {
                warn!(target: "app::command", "command cancelled before commit");
                CommandError::new("CANCELLED", "operation cancelled", None)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Runs a synchronous service call on the blocking pool.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("command task failed: {err}"), None))?
        .map_err(CommandError::from)
}
