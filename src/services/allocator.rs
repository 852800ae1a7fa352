use tracing::debug;

use crate::error::AppResult;
use crate::models::calendar::DayInterval;
use crate::models::planning::{Allocation, DemandWindow, PlannedStep, Underfill};
use crate::models::settings::PlannerSettings;
use crate::services::account_lock::PlanCancellation;
use crate::services::availability::AvailabilityIndex;
use crate::services::constraint_catalog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationRules {
    /// Fragments shorter than this are skipped unless less demand remains.
    pub min_unit_minutes: i64,
    pub max_unit_minutes: Option<i64>,
    pub max_daily_minutes: Option<i64>,
}

impl AllocationRules {
    pub fn from_settings(settings: &PlannerSettings) -> Self {
        Self {
            min_unit_minutes: settings.min_unit_minutes.max(0),
            max_unit_minutes: settings.max_unit_minutes.filter(|value| *value > 0),
            max_daily_minutes: settings.max_daily_minutes.filter(|value| *value > 0),
        }
    }
}

/// Earliest-deadline-first greedy placement into an [`AvailabilityIndex`].
///
/// Windows are taken in `(deadline, task id, release)` order. Each window walks its days from
/// the earliest onward and fills the earliest free interval first, splitting it when it is longer
/// than what is still required. Placed time is reserved in the index immediately, so a later
/// window can never take a slot from an earlier one. Shortfalls are reported as [`Underfill`]s.
pub struct Allocator {
    rules: AllocationRules,
}

impl Allocator {
    pub fn new(rules: AllocationRules) -> Self {
        Self { rules }
    }

    pub fn allocate(&self, windows: &[DemandWindow], index: &mut AvailabilityIndex) -> Allocation {
        let mut ordered = windows.to_vec();
        constraint_catalog::sort_windows(&mut ordered);

        let mut allocation = Allocation::default();
        for window in &ordered {
            self.place_window(window, index, &mut allocation);
        }
        allocation
    }

    /// Same as [`Allocator::allocate`] but gives up between windows once `cancel` fires.
    pub fn allocate_with_cancel(
        &self,
        windows: &[DemandWindow],
        index: &mut AvailabilityIndex,
        cancel: &PlanCancellation,
    ) -> AppResult<Allocation> {
        let mut ordered = windows.to_vec();
        constraint_catalog::sort_windows(&mut ordered);

        let mut allocation = Allocation::default();
        for window in &ordered {
            cancel.check()?;
            self.place_window(window, index, &mut allocation);
        }
        Ok(allocation)
    }

    fn place_window(
        &self,
        window: &DemandWindow,
        index: &mut AvailabilityIndex,
        allocation: &mut Allocation,
    ) {
        let mut remaining = window.required_minutes;
        let placed_before = allocation.steps.len();

        if let Some(range) = index.horizon().clamp(window.release, window.deadline) {
            for date in range.days() {
                while remaining > 0 {
                    let daily_left = self
                        .rules
                        .max_daily_minutes
                        .map(|cap| cap - index.day_load(date))
                        .unwrap_or(i64::MAX);
                    let min_len = self.rules.min_unit_minutes.min(remaining).max(1);
                    if daily_left < min_len {
                        break;
                    }

                    let Some(slot) = index.first_fit(date, min_len) else {
                        break;
                    };

                    let take = slot
                        .duration_minutes()
                        .min(remaining)
                        .min(daily_left)
                        .min(self.rules.max_unit_minutes.unwrap_or(i64::MAX));
                    let Some(unit) =
                        DayInterval::from_minutes(date, slot.start_minute(), slot.start_minute() + take)
                    else {
                        break;
                    };

                    index.reserve(&unit);
                    allocation.steps.push(PlannedStep {
                        task_id: window.task_id.clone(),
                        interval: unit,
                    });
                    remaining -= take;
                }

                if remaining <= 0 {
                    break;
                }
            }
        }

        debug!(
            target: "app::allocator",
            task_id = %window.task_id,
            deadline = %window.deadline,
            required = window.required_minutes,
            units = allocation.steps.len() - placed_before,
            missing = remaining.max(0),
            "demand window processed"
        );

        if remaining > 0 {
            allocation.underfills.push(Underfill {
                task_id: window.task_id.clone(),
                deadline: window.deadline,
                required_minutes: window.required_minutes,
                placed_minutes: window.required_minutes - remaining,
                missing_minutes: remaining,
            });
        }
    }
}
