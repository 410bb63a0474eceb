//! Date window paging for date-dependent analysis layers.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Source of "today". Injected so paging clamps are testable.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDirection {
    Backward,
    Forward,
}

/// Steps the current end date by a fixed number of days, never past today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePaginator {
    step_days: u32,
}

impl DatePaginator {
    pub fn new(step_days: u32) -> Self {
        Self { step_days }
    }

    pub fn step_days(&self) -> u32 {
        self.step_days
    }

    /// Moves `current` by `delta_days`.
    ///
    /// Backward moves are always honoured. Forward moves land on
    /// `min(current + delta_days, today)`, so a step from today stays on today.
    /// A date that would overflow the calendar leaves `current` unchanged.
    pub fn step(&self, current: NaiveDate, delta_days: i64, today: NaiveDate) -> NaiveDate {
        let moved = if delta_days >= 0 {
            current.checked_add_days(Days::new(delta_days.unsigned_abs()))
        } else {
            current.checked_sub_days(Days::new(delta_days.unsigned_abs()))
        };
        moved.unwrap_or(current).min(today)
    }

    /// Applies one configured step in `direction`.
    pub fn page(&self, current: NaiveDate, direction: PageDirection, today: NaiveDate) -> NaiveDate {
        let delta = i64::from(self.step_days);
        match direction {
            PageDirection::Backward => self.step(current, -delta, today),
            PageDirection::Forward => self.step(current, delta, today),
        }
    }

    pub fn can_step_forward(&self, current: NaiveDate, today: NaiveDate) -> bool {
        current < today
    }
}

impl Default for DatePaginator {
    fn default() -> Self {
        Self::new(crate::core::constants::PAGE_STEP_DAYS)
    }
}
