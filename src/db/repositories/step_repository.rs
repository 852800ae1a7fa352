use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::calendar::DayInterval;
use crate::models::step::{RatingLevel, StepRecord, StepStatus, UnitRatings};
use crate::services::schedule_utils::{format_date, format_time, parse_date, parse_time};

#[derive(Debug, Clone)]
pub struct StepRow {
    pub id: String,
    pub account_id: String,
    pub task_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub actual_minutes: Option<i64>,
    pub goal_completion: Option<i64>,
    pub perceived_duration: Option<i64>,
    pub concentration: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl StepRow {
    pub fn from_record(record: &StepRecord) -> Self {
        Self {
            id: record.id.clone(),
            account_id: record.account_id.clone(),
            task_id: record.task_id.clone(),
            date: format_date(record.interval.date),
            start_time: format_time(record.interval.start),
            end_time: format_time(record.interval.end),
            status: record.status.as_str().to_string(),
            actual_minutes: record.actual_minutes,
            goal_completion: record.ratings.map(|r| r.goal_completion.score()),
            perceived_duration: record.ratings.map(|r| r.perceived_duration.score()),
            concentration: record.ratings.map(|r| r.concentration.score()),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<StepRecord> {
        let status = StepStatus::parse(&self.status)
            .ok_or_else(|| AppError::database(format!("unknown step status {}", self.status)))?;
        let interval = DayInterval::new(
            parse_date(&self.date)?,
            parse_time(&self.start_time)?,
            parse_time(&self.end_time)?,
        )?;

        let ratings = match (self.goal_completion, self.perceived_duration, self.concentration) {
            (Some(goal), Some(duration), Some(concentration)) => Some(UnitRatings {
                goal_completion: level(goal)?,
                perceived_duration: level(duration)?,
                concentration: level(concentration)?,
            }),
            _ => None,
        };

        Ok(StepRecord {
            id: self.id,
            account_id: self.account_id,
            task_id: self.task_id,
            interval,
            status,
            actual_minutes: self.actual_minutes,
            ratings,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn level(score: i64) -> AppResult<RatingLevel> {
    RatingLevel::from_score(score)
        .ok_or_else(|| AppError::database(format!("rating score {score} out of range")))
}

impl TryFrom<&Row<'_>> for StepRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            task_id: row.get("task_id")?,
            date: row.get("date")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            status: row.get("status")?,
            actual_minutes: row.get("actual_minutes")?,
            goal_completion: row.get("goal_completion")?,
            perceived_duration: row.get("perceived_duration")?,
            concentration: row.get("concentration")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        s.id, s.account_id, s.task_id, s.date, s.start_time, s.end_time, s.status,
        s.actual_minutes, r.goal_completion, r.perceived_duration, r.concentration,
        s.created_at, s.updated_at
    FROM steps s
    LEFT JOIN step_ratings r ON r.step_id = s.id
"#;

const ORDER_BY_SLOT: &str = "ORDER BY s.date ASC, s.start_time ASC, s.id ASC";

pub struct StepRepository;

impl StepRepository {
    pub fn insert(conn: &Connection, row: &StepRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO steps (
                    id, account_id, task_id, date, start_time, end_time, status,
                    actual_minutes, created_at, updated_at
                ) VALUES (
                    :id, :account_id, :task_id, :date, :start_time, :end_time, :status,
                    :actual_minutes, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":account_id": &row.account_id,
                ":task_id": &row.task_id,
                ":date": &row.date,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
                ":status": &row.status,
                ":actual_minutes": &row.actual_minutes,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;
        Ok(())
    }

    /// Updates slot and lifecycle columns; ratings live in `step_ratings`.
    pub fn update(conn: &Connection, row: &StepRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE steps SET
                    date = :date,
                    start_time = :start_time,
                    end_time = :end_time,
                    status = :status,
                    actual_minutes = :actual_minutes,
                    updated_at = :updated_at
                WHERE id = :id AND account_id = :account_id
            "#,
            named_params! {
                ":id": &row.id,
                ":account_id": &row.account_id,
                ":date": &row.date,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
                ":status": &row.status,
                ":actual_minutes": &row.actual_minutes,
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
            "DELETE FROM steps WHERE id = ?1 AND account_id = ?2",
            [id, account_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, account_id: &str, id: &str) -> AppResult<Option<StepRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE s.id = ?1 AND s.account_id = ?2");
        let mut stmt = conn.prepare(&sql)?;
        let row = stmt
            .query_row([id, account_id], |row| StepRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_for_account(conn: &Connection, account_id: &str) -> AppResult<Vec<StepRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE s.account_id = ?1 {ORDER_BY_SLOT}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([account_id], |row| StepRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Steps dated inside `[from, to]` (inclusive, `YYYY-MM-DD`).
    pub fn list_between(
        conn: &Connection,
        account_id: &str,
        from: &str,
        to: &str,
    ) -> AppResult<Vec<StepRow>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE s.account_id = :account_id AND s.date BETWEEN :from AND :to {ORDER_BY_SLOT}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                named_params! {":account_id": account_id, ":from": from, ":to": to},
                |row| StepRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_by_status(
        conn: &Connection,
        account_id: &str,
        status: StepStatus,
    ) -> AppResult<Vec<StepRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE s.account_id = ?1 AND s.status = ?2 {ORDER_BY_SLOT}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([account_id, status.as_str()], |row| StepRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_for_task(conn: &Connection, account_id: &str, task_id: &str) -> AppResult<Vec<StepRow>> {
        let sql = format!("{SELECT_COLUMNS} WHERE s.account_id = ?1 AND s.task_id = ?2 {ORDER_BY_SLOT}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([account_id, task_id], |row| StepRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Accounts that still own scheduled steps dated on or before `date`.
    pub fn list_accounts_with_scheduled_before(conn: &Connection, date: &str) -> AppResult<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT account_id FROM steps WHERE status = 'scheduled' AND date <= ?1 ORDER BY account_id",
        )?;
        let accounts = stmt
            .query_map([date], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    pub fn upsert_rating(
        conn: &Connection,
        account_id: &str,
        step_id: &str,
        ratings: &UnitRatings,
        rated_at: &str,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO step_ratings (
                    step_id, account_id, goal_completion, perceived_duration, concentration, rated_at
                ) VALUES (
                    :step_id, :account_id, :goal_completion, :perceived_duration, :concentration, :rated_at
                )
                ON CONFLICT(step_id) DO UPDATE SET
                    goal_completion = excluded.goal_completion,
                    perceived_duration = excluded.perceived_duration,
                    concentration = excluded.concentration,
                    rated_at = excluded.rated_at
            "#,
            named_params! {
                ":step_id": step_id,
                ":account_id": account_id,
                ":goal_completion": ratings.goal_completion.score(),
                ":perceived_duration": ratings.perceived_duration.score(),
                ":concentration": ratings.concentration.score(),
                ":rated_at": rated_at,
            },
        )?;
        Ok(())
    }
}
