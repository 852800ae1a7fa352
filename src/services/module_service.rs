use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::db::repositories::module_repository::{ModuleRepository, ModuleRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::module::{ModuleCreateInput, ModuleRecord, ModuleUpdateInput};
use crate::services::account_lock::AccountLocks;
use crate::services::task_service::{normalize_optional_string, normalize_title};

const DEFAULT_COLOR: &str = "#4F46E5";

#[derive(Clone)]
pub struct ModuleService {
    db: DbPool,
    locks: Arc<AccountLocks>,
}

impl ModuleService {
    pub fn new(db: DbPool, locks: Arc<AccountLocks>) -> Self {
        Self { db, locks }
    }

    pub fn create_module(&self, account_id: &str, input: ModuleCreateInput) -> AppResult<ModuleRecord> {
        let now = Utc::now().to_rfc3339();
        let record = ModuleRecord {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            title: normalize_title(&input.title)?,
            description: normalize_optional_string(input.description),
            priority: input.priority.unwrap_or_default(),
            color: normalize_color(input.color)?,
            created_at: now.clone(),
            updated_at: now,
        };

        let row = ModuleRow::from_record(&record);
        self.db
            .with_connection(|conn| ModuleRepository::insert(conn, &row))?;
        info!(target: "app::planning", account_id, module_id = %record.id, "module created");
        Ok(record)
    }

    pub fn update_module(
        &self,
        account_id: &str,
        id: &str,
        update: ModuleUpdateInput,
    ) -> AppResult<ModuleRecord> {
        let mut existing = self.get_module(account_id, id)?;

        if let Some(title) = update.title {
            existing.title = normalize_title(&title)?;
        }
        if let Some(description) = update.description {
            existing.description = normalize_optional_string(description);
        }
        if let Some(priority) = update.priority {
            existing.priority = priority;
        }
        if let Some(color) = update.color {
            existing.color = normalize_color(Some(color))?;
        }
        existing.updated_at = Utc::now().to_rfc3339();

        let row = ModuleRow::from_record(&existing);
        self.db
            .with_connection(|conn| ModuleRepository::update(conn, &row))?;
        info!(target: "app::planning", account_id, module_id = %id, "module updated");
        Ok(existing)
    }

    /// Deletes the module together with its tasks and their steps.
    pub fn delete_module(&self, account_id: &str, id: &str) -> AppResult<()> {
        self.locks.with_write(account_id, || {
            self.db
                .with_connection(|conn| ModuleRepository::delete(conn, account_id, id))
        })?;
        info!(target: "app::planning", account_id, module_id = %id, "module deleted");
        Ok(())
    }

    pub fn get_module(&self, account_id: &str, id: &str) -> AppResult<ModuleRecord> {
        let row = self
            .db
            .with_connection(|conn| ModuleRepository::find_by_id(conn, account_id, id))?
            .ok_or_else(AppError::not_found)?;
        row.into_record()
    }

    pub fn list_modules(&self, account_id: &str) -> AppResult<Vec<ModuleRecord>> {
        let rows = self
            .db
            .with_connection(|conn| ModuleRepository::list_for_account(conn, account_id))?;
        let modules = rows
            .into_iter()
            .map(ModuleRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::planning", account_id, count = modules.len(), "modules listed");
        Ok(modules)
    }
}

fn normalize_color(color: Option<String>) -> AppResult<String> {
    let Some(raw) = normalize_optional_string(color) else {
        return Ok(DEFAULT_COLOR.to_string());
    };
    let valid = raw.len() == 7
        && raw.starts_with('#')
        && raw[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(raw.to_uppercase())
    } else {
        Err(AppError::validation("color must look like #RRGGBB"))
    }
}
