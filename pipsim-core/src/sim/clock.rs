//! The logical simulation clock.

use chrono::{Duration, NaiveDateTime};

/// Advances one simulated minute per tick, independent of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    now: NaiveDateTime,
}

impl SimClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self { now: start }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn tick(&mut self) {
        self.now += Duration::minutes(1);
    }
}
