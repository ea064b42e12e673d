//! Injectable calendar/clock source.
//!
//! Daily-limit resets compare calendar dates and history entries carry
//! timestamps, so the engine never reads wall-clock time directly. Tests
//! pin the clock to exercise date rollover deterministically.

use chrono::{Local, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;

/// Source of "current date" and "current timestamp" for the engine
pub trait Clock {
    /// Current calendar date, used for daily-counter resets
    fn today(&self) -> NaiveDate;
    /// Current timestamp, used for history entries and receipts
    fn now(&self) -> NaiveDateTime;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }

    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Wall clock in the machine's local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to an explicit instant, advanced manually. For tests and
/// replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    /// Pin the clock to `now`
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to an explicit instant
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    /// Advance the clock by whole days, crossing date boundaries
    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock();
        *now += chrono::Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.now.lock().date()
    }

    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}
