use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;

/// Planner settings stored as one JSON document per account.
#[derive(Debug, Clone)]
pub struct PlannerSettingsRow {
    pub account_id: String,
    pub value: String,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for PlannerSettingsRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            account_id: row.get("account_id")?,
            value: row.get("value")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct SettingsRepository;

impl SettingsRepository {
    pub fn get(conn: &Connection, account_id: &str) -> AppResult<Option<PlannerSettingsRow>> {
        let mut stmt = conn.prepare(
            "SELECT account_id, value, updated_at FROM planner_settings WHERE account_id = ?1",
        )?;

        let row = stmt
            .query_row([account_id], |row| PlannerSettingsRow::try_from(row))
            .optional()?;

        Ok(row)
    }

    pub fn upsert(conn: &Connection, account_id: &str, value: &str, updated_at: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO planner_settings (account_id, value, updated_at)
                VALUES (:account_id, :value, :updated_at)
                ON CONFLICT(account_id) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
            "#,
            named_params! {":account_id": account_id, ":value": value, ":updated_at": updated_at},
        )?;

        Ok(())
    }

    pub fn delete(conn: &Connection, account_id: &str) -> AppResult<()> {
        conn.execute("DELETE FROM planner_settings WHERE account_id = ?1", [account_id])?;
        Ok(())
    }
}
