//! Date source for age rules and computed fields.
//!
//! The engine never reads the system clock directly; a [`Clock`] is injected
//! at construction so resolutions are reproducible under test.

use chrono::NaiveDate;

/// Trait for supplying "today".
pub trait Clock: Send + Sync {
    /// The current calendar date.
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the system time, in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

/// Clock pinned to a fixed date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl FixedClock {
    /// Pin to the given calendar date. Returns `None` for an invalid date.
    pub fn ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
