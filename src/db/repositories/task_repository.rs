use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::task::{TaskKind, TaskRecord};
use crate::services::schedule_utils::{format_date, format_datetime, parse_date, parse_datetime};

/// Flat row for the tagged `tasks` table: `kind` selects which variant columns are set.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub account_id: String,
    pub module_id: String,
    pub title: String,
    pub weekly_time_load: i64,
    pub send_notification: bool,
    pub kind: String,
    pub exam_date: Option<String>,
    pub first_date: Option<String>,
    pub cycle: Option<i64>,
    pub last_date: Option<String>,
    pub range_start: Option<String>,
    pub range_end: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    pub fn from_record(record: &TaskRecord) -> Self {
        let mut row = Self {
            id: record.id.clone(),
            account_id: record.account_id.clone(),
            module_id: record.module_id.clone(),
            title: record.title.clone(),
            weekly_time_load: record.weekly_time_load,
            send_notification: record.send_notification,
            kind: record.kind.label().to_string(),
            exam_date: None,
            first_date: None,
            cycle: None,
            last_date: None,
            range_start: None,
            range_end: None,
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        };

        match &record.kind {
            TaskKind::Exam { exam_date } => {
                row.exam_date = Some(format_date(*exam_date));
            }
            TaskKind::Submission {
                first_date,
                cycle,
                last_date,
            } => {
                row.first_date = Some(format_datetime(*first_date));
                row.cycle = Some(i64::from(*cycle));
                row.last_date = last_date.map(format_date);
            }
            TaskKind::Other { start, end } => {
                row.range_start = Some(format_date(*start));
                row.range_end = Some(format_date(*end));
            }
        }

        row
    }

    pub fn into_record(self) -> AppResult<TaskRecord> {
        let kind = match self.kind.as_str() {
            "exam" => TaskKind::Exam {
                exam_date: parse_date(required(&self.exam_date, "exam_date")?)?,
            },
            "submission" => {
                let cycle = self
                    .cycle
                    .and_then(|value| u32::try_from(value).ok())
                    .ok_or_else(|| AppError::database("submission task without a valid cycle"))?;
                TaskKind::Submission {
                    first_date: parse_datetime(required(&self.first_date, "first_date")?)?,
                    cycle,
                    last_date: self.last_date.as_deref().map(parse_date).transpose()?,
                }
            }
            "other" => TaskKind::Other {
                start: parse_date(required(&self.range_start, "range_start")?)?,
                end: parse_date(required(&self.range_end, "range_end")?)?,
            },
            other => return Err(AppError::database(format!("unknown task kind {other}"))),
        };

        Ok(TaskRecord {
            id: self.id,
            account_id: self.account_id,
            module_id: self.module_id,
            title: self.title,
            weekly_time_load: self.weekly_time_load,
            send_notification: self.send_notification,
            kind,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn required<'a>(value: &'a Option<String>, column: &str) -> AppResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| AppError::database(format!("task row is missing {column}")))
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            module_id: row.get("module_id")?,
            title: row.get("title")?,
            weekly_time_load: row.get("weekly_time_load")?,
            send_notification: row.get::<_, i64>("send_notification")? != 0,
            kind: row.get("kind")?,
            exam_date: row.get("exam_date")?,
            first_date: row.get("first_date")?,
            cycle: row.get("cycle")?,
            last_date: row.get("last_date")?,
            range_start: row.get("range_start")?,
            range_end: row.get("range_end")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, account_id, module_id, title, weekly_time_load, send_notification, kind,
        exam_date, first_date, cycle, last_date, range_start, range_end, created_at, updated_at
    FROM tasks
"#;

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tasks (
                    id, account_id, module_id, title, weekly_time_load, send_notification, kind,
                    exam_date, first_date, cycle, last_date, range_start, range_end,
                    created_at, updated_at
                ) VALUES (
                    :id, :account_id, :module_id, :title, :weekly_time_load, :send_notification, :kind,
                    :exam_date, :first_date, :cycle, :last_date, :range_start, :range_end,
                    :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":account_id": &row.account_id,
                ":module_id": &row.module_id,
                ":title": &row.title,
                ":weekly_time_load": &row.weekly_time_load,
                ":send_notification": &row.send_notification,
                ":kind": &row.kind,
                ":exam_date": &row.exam_date,
                ":first_date": &row.first_date,
                ":cycle": &row.cycle,
                ":last_date": &row.last_date,
                ":range_start": &row.range_start,
                ":range_end": &row.range_end,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn update(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE tasks SET
                    module_id = :module_id,
                    title = :title,
                    weekly_time_load = :weekly_time_load,
                    send_notification = :send_notification,
                    kind = :kind,
                    exam_date = :exam_date,
                    first_date = :first_date,
                    cycle = :cycle,
                    last_date = :last_date,
                    range_start = :range_start,
                    range_end = :range_end,
                    updated_at = :updated_at
                WHERE id = :id AND account_id = :account_id
            "#,
            named_params! {
                ":id": &row.id,
                ":account_id": &row.account_id,
                ":module_id": &row.module_id,
                ":title": &row.title,
                ":weekly_time_load": &row.weekly_time_load,
                ":send_notification": &row.send_notification,
                ":kind": &row.kind,
                ":exam_date": &row.exam_date,
                ":first_date": &row.first_date,
                ":cycle": &row.cycle,
                ":last_date": &row.last_date,
                ":range_start": &row.range_start,
                ":range_end": &row.range_end,
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
            "DELETE FROM tasks WHERE id = ?1 AND account_id = ?2",
            [id, account_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, account_id: &str, id: &str) -> AppResult<Option<TaskRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1 AND account_id = ?2");
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row([id, account_id], |row| TaskRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_for_account(conn: &Connection, account_id: &str) -> AppResult<Vec<TaskRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE account_id = ?1 ORDER BY id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([account_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_for_module(
        conn: &Connection,
        account_id: &str,
        module_id: &str,
    ) -> AppResult<Vec<TaskRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE account_id = ?1 AND module_id = ?2 ORDER BY id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([account_id, module_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
