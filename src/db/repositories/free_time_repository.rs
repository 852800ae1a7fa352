use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::free_time::FreeTimeRecord;
use crate::services::schedule_utils::{format_date, format_time, parse_date, parse_time};

#[derive(Debug, Clone)]
pub struct FreeTimeRow {
    pub id: String,
    pub account_id: String,
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub weekly: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl FreeTimeRow {
    pub fn from_record(record: &FreeTimeRecord) -> Self {
        Self {
            id: record.id.clone(),
            account_id: record.account_id.clone(),
            title: record.title.clone(),
            date: format_date(record.date),
            start_time: format_time(record.start_time),
            end_time: format_time(record.end_time),
            weekly: record.weekly,
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<FreeTimeRecord> {
        Ok(FreeTimeRecord {
            date: parse_date(&self.date)?,
            start_time: parse_time(&self.start_time)?,
            end_time: parse_time(&self.end_time)?,
            id: self.id,
            account_id: self.account_id,
            title: self.title,
            weekly: self.weekly,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for FreeTimeRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            title: row.get("title")?,
            date: row.get("date")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            weekly: row.get::<_, i64>("weekly")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, account_id, title, date, start_time, end_time, weekly, created_at, updated_at FROM free_times";

pub struct FreeTimeRepository;

impl FreeTimeRepository {
    pub fn insert(conn: &Connection, row: &FreeTimeRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO free_times (
                    id, account_id, title, date, start_time, end_time, weekly, created_at, updated_at
                ) VALUES (
                    :id, :account_id, :title, :date, :start_time, :end_time, :weekly, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":account_id": &row.account_id,
                ":title": &row.title,
                ":date": &row.date,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
                ":weekly": &row.weekly,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn update(conn: &Connection, row: &FreeTimeRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE free_times SET
                    title = :title,
                    date = :date,
                    start_time = :start_time,
                    end_time = :end_time,
                    weekly = :weekly,
                    updated_at = :updated_at
                WHERE id = :id AND account_id = :account_id
            "#,
            named_params! {
                ":id": &row.id,
                ":account_id": &row.account_id,
                ":title": &row.title,
                ":date": &row.date,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
                ":weekly": &row.weekly,
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
            "DELETE FROM free_times WHERE id = ?1 AND account_id = ?2",
            [id, account_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(
        conn: &Connection,
        account_id: &str,
        id: &str,
    ) -> AppResult<Option<FreeTimeRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1 AND account_id = ?2");
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row([id, account_id], |row| FreeTimeRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_for_account(conn: &Connection, account_id: &str) -> AppResult<Vec<FreeTimeRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE account_id = ?1 ORDER BY date ASC, start_time ASC, id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([account_id], |row| FreeTimeRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Weekly entries starting on or before `to`, plus one-off entries inside `[from, to]`.
    pub fn list_active_between(
        conn: &Connection,
        account_id: &str,
        from: &str,
        to: &str,
    ) -> AppResult<Vec<FreeTimeRow>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE account_id = :account_id AND (\
                (weekly = 1 AND date <= :to) OR (weekly = 0 AND date BETWEEN :from AND :to)\
             ) ORDER BY date ASC, start_time ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                named_params! {":account_id": account_id, ":from": from, ":to": to},
                |row| FreeTimeRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
