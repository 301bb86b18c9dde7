//! Injectable clock abstraction.
//!
//! The payment reminder scheduler and the once-per-day stamp logic compare
//! calendar dates, so tests need to control "now" deterministically.

use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Current calendar date in UTC. Day-granular comparisons (reminder
    /// stamps, due dates) always go through this, never timestamp diffs.
    fn today(&self) -> Date {
        self.now().to_zoned(TimeZone::UTC).date()
    }
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Converts a timestamp to its UTC calendar date.
pub fn date_of(ts: Timestamp) -> Date {
    ts.to_zoned(TimeZone::UTC).date()
}

#[cfg(test)]
pub mod manual {
    //! Hand-driven clock for tests.

    use std::sync::Mutex;

    use super::*;

    /// Clock whose time only moves when the test advances it.
    pub struct ManualClock {
        now: Mutex<Timestamp>,
    }

    impl ManualClock {
        pub fn at(ts: Timestamp) -> Self {
            Self {
                now: Mutex::new(ts),
            }
        }

        /// Starts the clock at noon UTC on the given civil date.
        pub fn on_date(year: i16, month: i8, day: i8) -> Self {
            let ts = jiff::civil::date(year, month, day)
                .at(12, 0, 0, 0)
                .to_zoned(TimeZone::UTC)
                .unwrap()
                .timestamp();
            Self::at(ts)
        }

        pub fn advance_days(&self, days: i64) {
            let mut now = self.now.lock().unwrap();
            *now = *now + jiff::Span::new().hours(days * 24);
        }

        pub fn advance_hours(&self, hours: i64) {
            let mut now = self.now.lock().unwrap();
            *now = *now + jiff::Span::new().hours(hours);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            *self.now.lock().unwrap()
        }
    }
}
