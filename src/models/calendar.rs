use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::services::schedule_utils;

/// A half-open `[start, end)` interval on a single calendar day.
///
/// Multi-day spans never exist as one value; callers split them per day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct DayInterval {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl DayInterval {
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> AppResult<Self> {
        if end <= start {
            return Err(AppError::validation_with_details(
                "interval end must be after its start",
                json!({
                    "date": schedule_utils::format_date(date),
                    "start": schedule_utils::format_time(start),
                    "end": schedule_utils::format_time(end),
                }),
            ));
        }
        Ok(Self { date, start, end })
    }

    /// Builds an interval from minute offsets; `None` when the range is empty or leaves the day.
    pub fn from_minutes(date: NaiveDate, start_minute: i64, end_minute: i64) -> Option<Self> {
        if start_minute < 0 || end_minute <= start_minute || end_minute >= schedule_utils::MINUTES_PER_DAY {
            return None;
        }
        Some(Self {
            date,
            start: schedule_utils::to_naive_time(start_minute as u32),
            end: schedule_utils::to_naive_time(end_minute as u32),
        })
    }

    pub fn start_minute(&self) -> i64 {
        schedule_utils::minutes_from_midnight(self.start)
    }

    pub fn end_minute(&self) -> i64 {
        schedule_utils::minutes_from_midnight(self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        schedule_utils::duration_minutes(self)
    }

    pub fn overlaps(&self, other: &DayInterval) -> bool {
        schedule_utils::overlaps(self, other)
    }

    pub fn contains(&self, other: &DayInterval) -> bool {
        self.date == other.date && self.start <= other.start && other.end <= self.end
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.start)
    }

    pub fn end_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.end)
    }
}

/// Inclusive date range a plan is generated for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Horizon {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Horizon {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if end < start {
            return Err(AppError::validation_with_details(
                "horizon end must not precede its start",
                json!({
                    "start": schedule_utils::format_date(start),
                    "end": schedule_utils::format_date(end),
                }),
            ));
        }
        Ok(Self { start, end })
    }

    /// Monday through Sunday of the week containing `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        Self {
            start: monday,
            end: monday + Duration::days(6),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len_days()).map(move |offset| start + Duration::days(offset))
    }

    /// Intersection with `[from, to]`, if any day remains.
    pub fn clamp(&self, from: NaiveDate, to: NaiveDate) -> Option<Horizon> {
        let start = self.start.max(from);
        let end = self.end.min(to);
        (start <= end).then_some(Horizon { start, end })
    }
}

pub fn weekday_index(weekday: Weekday) -> u32 {
    weekday.num_days_from_monday()
}
