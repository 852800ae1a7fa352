use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::calendar::DayInterval;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FreeTimeRecord {
    pub id: String,
    pub account_id: String,
    pub title: String,
    /// For weekly entries only the weekday (and the first active date) matter.
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub weekly: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl FreeTimeRecord {
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        if self.weekly {
            date >= self.date && date.weekday() == self.date.weekday()
        } else {
            date == self.date
        }
    }

    pub fn occurrence_on(&self, date: NaiveDate) -> Option<DayInterval> {
        if !self.occurs_on(date) || self.end_time <= self.start_time {
            return None;
        }
        Some(DayInterval {
            date,
            start: self.start_time,
            end: self.end_time,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FreeTimeCreateInput {
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub weekly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FreeTimeUpdateInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub weekly: Option<bool>,
}
