use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

use crate::models::calendar::{DayInterval, Horizon};
use crate::models::free_time::FreeTimeRecord;
use crate::models::settings::PlannerSettings;
use crate::services::schedule_utils::{self, MINUTES_PER_DAY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRules {
    pub day_start_minute: i64,
    pub day_end_minute: i64,
    pub study_days: Vec<Weekday>,
    /// Nothing is offered before this instant.
    pub not_before: Option<NaiveDateTime>,
    /// Minutes kept clear on both sides of every placed unit.
    pub padding_minutes: i64,
}

impl AvailabilityRules {
    pub fn from_settings(settings: &PlannerSettings, not_before: Option<NaiveDateTime>) -> Self {
        let (start, end) = settings.planning_window();
        Self {
            day_start_minute: i64::from(start),
            day_end_minute: i64::from(end),
            study_days: settings.study_days.clone(),
            not_before,
            padding_minutes: settings.break_minutes.max(0),
        }
    }

    fn opening_of(&self, date: NaiveDate) -> Option<DayInterval> {
        if !self.study_days.contains(&date.weekday()) {
            return None;
        }
        let mut start = self.day_start_minute.max(0);
        if let Some(now) = self.not_before {
            if date < now.date() {
                return None;
            }
            if date == now.date() {
                start = start.max(schedule_utils::ceil_minute_of(now.time()));
            }
        }
        DayInterval::from_minutes(date, start, self.day_end_minute.min(MINUTES_PER_DAY - 1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DaySlots {
    free: Vec<DayInterval>,
    load_minutes: i64,
}

/// Free study intervals per day of a horizon.
///
/// Built from the day window minus free-time occurrences and already placed units; the
/// allocator reserves into it as it places new units so later demand never sees that time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityIndex {
    horizon: Horizon,
    padding_minutes: i64,
    days: BTreeMap<NaiveDate, DaySlots>,
}

impl AvailabilityIndex {
    pub fn build(
        horizon: Horizon,
        rules: &AvailabilityRules,
        free_times: &[FreeTimeRecord],
        placed: &[DayInterval],
    ) -> Self {
        let mut days = BTreeMap::new();

        for date in horizon.days() {
            let mut busy = free_times
                .iter()
                .filter_map(|free_time| free_time.occurrence_on(date))
                .collect::<Vec<_>>();

            let mut load_minutes = 0;
            for unit in placed.iter().filter(|unit| unit.date == date) {
                load_minutes += unit.duration_minutes();
                busy.push(padded(unit, rules.padding_minutes));
            }

            let free = match rules.opening_of(date) {
                Some(opening) => schedule_utils::subtract(&[opening], &busy),
                None => Vec::new(),
            };

            days.insert(date, DaySlots { free, load_minutes });
        }

        Self {
            horizon,
            padding_minutes: rules.padding_minutes,
            days,
        }
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn free_intervals(&self, date: NaiveDate) -> &[DayInterval] {
        self.days
            .get(&date)
            .map(|slots| slots.free.as_slice())
            .unwrap_or(&[])
    }

    /// Earliest free interval on `date` that is at least `min_minutes` long.
    pub fn first_fit(&self, date: NaiveDate, min_minutes: i64) -> Option<DayInterval> {
        self.free_intervals(date)
            .iter()
            .find(|interval| interval.duration_minutes() >= min_minutes)
            .copied()
    }

    pub fn is_free(&self, interval: &DayInterval) -> bool {
        self.free_intervals(interval.date)
            .iter()
            .any(|free| free.contains(interval))
    }

    pub fn day_load(&self, date: NaiveDate) -> i64 {
        self.days.get(&date).map(|slots| slots.load_minutes).unwrap_or(0)
    }

    pub fn total_free_minutes(&self) -> i64 {
        self.days
            .values()
            .flat_map(|slots| slots.free.iter())
            .map(DayInterval::duration_minutes)
            .sum()
    }

    /// Marks `interval` (plus padding) as taken and counts it toward the day's load.
    pub fn reserve(&mut self, interval: &DayInterval) {
        let blocked = padded(interval, self.padding_minutes);
        if let Some(slots) = self.days.get_mut(&interval.date) {
            slots.free = schedule_utils::subtract(&slots.free, &[blocked]);
            slots.load_minutes += interval.duration_minutes();
        }
    }
}

fn padded(interval: &DayInterval, padding: i64) -> DayInterval {
    if padding <= 0 {
        return *interval;
    }
    let start = (interval.start_minute() - padding).max(0);
    let end = (interval.end_minute() + padding).min(MINUTES_PER_DAY - 1);
    DayInterval::from_minutes(interval.date, start, end).unwrap_or(*interval)
}
