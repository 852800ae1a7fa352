use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::calendar::DayInterval;

pub const MINUTES_PER_DAY: i64 = 24 * 60;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid date format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn parse_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid time format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn parse_datetime(value: &str) -> AppResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid date-time format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Half-open overlap test; intervals on different days never overlap.
pub fn overlaps(a: &DayInterval, b: &DayInterval) -> bool {
    a.date == b.date && a.start < b.end && b.start < a.end
}

pub fn duration_minutes(interval: &DayInterval) -> i64 {
    minutes_from_midnight(interval.end) - minutes_from_midnight(interval.start)
}

/// Removes every busy interval from `available`, splitting where a busy block
/// lands in the middle. The result is sorted by date and start.
pub fn subtract(available: &[DayInterval], busy: &[DayInterval]) -> Vec<DayInterval> {
    let mut result = Vec::with_capacity(available.len());

    for base in available {
        let mut blocked = busy
            .iter()
            .filter(|candidate| overlaps(base, candidate))
            .map(|candidate| (candidate.start_minute(), candidate.end_minute()))
            .collect::<Vec<_>>();
        blocked.sort_unstable();

        let mut cursor = base.start_minute();
        let end = base.end_minute();
        for (block_start, block_end) in blocked {
            if block_start > cursor {
                if let Some(piece) = DayInterval::from_minutes(base.date, cursor, block_start.min(end)) {
                    result.push(piece);
                }
            }
            cursor = cursor.max(block_end);
            if cursor >= end {
                break;
            }
        }
        if let Some(piece) = DayInterval::from_minutes(base.date, cursor, end) {
            result.push(piece);
        }
    }

    result.sort();
    result
}

pub fn ensure_window(start: NaiveTime, end: NaiveTime) -> AppResult<()> {
    if end <= start {
        Err(AppError::validation("window end must be after its start"))
    } else {
        Ok(())
    }
}

pub fn minutes_from_midnight(time: NaiveTime) -> i64 {
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

/// Minute of the day at or after `time`; seconds round up so nothing is placed in the past.
pub fn ceil_minute_of(time: NaiveTime) -> i64 {
    let base = minutes_from_midnight(time);
    if time.second() > 0 || time.nanosecond() > 0 {
        base + 1
    } else {
        base
    }
}

pub fn to_naive_time(total_minutes: u32) -> NaiveTime {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    NaiveTime::from_hms_opt(hours, minutes, 0).unwrap_or(NaiveTime::MIN)
}
