//! A clock that only moves when told to.

use std::sync::{Arc, Mutex};

use agentwallet_types::Clock;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Deterministic [`Clock`] for tests. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Start at `YYYY-MM-DD HH:MM:00` UTC.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let start = Utc
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("valid test timestamp");
        Self::new(start)
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    /// Midday on a fixed date, far from any day boundary.
    fn default() -> Self {
        Self::at(2025, 6, 15, 12, 0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
