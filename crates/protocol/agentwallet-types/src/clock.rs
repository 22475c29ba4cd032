//! Wall clock abstraction.
//!
//! Daily spend windows, expiry sweeps and payment freshness checks all read
//! the time through [`Clock`] so tests can move time forward deterministically.

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Midnight UTC of the day containing `ts`.
pub fn utc_day_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// The half-open UTC day `[start, start + 1 day)` containing `ts`.
pub fn utc_day_bounds(ts: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = utc_day_start(ts);
    (start, start + Duration::days(1))
}
