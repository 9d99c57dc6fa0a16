//! Day-granularity date helpers and the injectable clock.
//!
//! All "is this the same day" and "which weekday is this" questions in the
//! crate go through this module.

use crate::entities::WeekDay;
use chrono::{DateTime, Datelike, Local};

/// True when both instants fall on the same local calendar day.
pub fn same_calendar_day(a: &DateTime<Local>, b: &DateTime<Local>) -> bool {
    a.date_naive() == b.date_naive()
}

/// ISO weekday of `date`, Monday first regardless of locale settings.
pub fn iso_weekday(date: &DateTime<Local>) -> WeekDay {
    let number = date.weekday().number_from_monday();
    // number_from_monday is always 1..=7
    WeekDay::from_iso_number(number).unwrap_or(WeekDay::Monday)
}

/// Source of "now" for the engine.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}
