use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::module::{ModulePriority, ModuleRecord};

#[derive(Debug, Clone)]
pub struct ModuleRow {
    pub id: String,
    pub account_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub color: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ModuleRow {
    pub fn from_record(record: &ModuleRecord) -> Self {
        Self {
            id: record.id.clone(),
            account_id: record.account_id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            priority: record.priority.as_str().to_string(),
            color: record.color.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<ModuleRecord> {
        let priority = ModulePriority::parse(&self.priority)
            .ok_or_else(|| AppError::database(format!("unknown module priority {}", self.priority)))?;
        Ok(ModuleRecord {
            id: self.id,
            account_id: self.account_id,
            title: self.title,
            description: self.description,
            priority,
            color: self.color,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for ModuleRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            priority: row.get("priority")?,
            color: row.get("color")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, account_id, title, description, priority, color, created_at, updated_at FROM modules";

pub struct ModuleRepository;

impl ModuleRepository {
    pub fn insert(conn: &Connection, row: &ModuleRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO modules (
                    id, account_id, title, description, priority, color, created_at, updated_at
                ) VALUES (
                    :id, :account_id, :title, :description, :priority, :color, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":account_id": &row.account_id,
                ":title": &row.title,
                ":description": &row.description,
                ":priority": &row.priority,
                ":color": &row.color,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn update(conn: &Connection, row: &ModuleRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE modules SET
                    title = :title,
                    description = :description,
                    priority = :priority,
                    color = :color,
                    updated_at = :updated_at
                WHERE id = :id AND account_id = :account_id
            "#,
            named_params! {
                ":id": &row.id,
                ":account_id": &row.account_id,
                ":title": &row.title,
                ":description": &row.description,
                ":priority": &row.priority,
                ":color": &row.color,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, account_id: &str, id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM modules WHERE id = ?1 AND account_id = ?2",
            [id, account_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, account_id: &str, id: &str) -> AppResult<Option<ModuleRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1 AND account_id = ?2");
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row([id, account_id], |row| ModuleRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_for_account(conn: &Connection, account_id: &str) -> AppResult<Vec<ModuleRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE account_id = ?1 ORDER BY title ASC, id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([account_id], |row| ModuleRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
