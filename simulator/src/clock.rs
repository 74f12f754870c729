use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Real seconds that make up one simulated hour (24 minutes = 24 hours).
pub const SECONDS_PER_SIM_HOUR: f64 = 60.0;

/// Compressed day/night clock plus a monotonic timestamp source.
#[derive(Debug, Clone)]
pub struct SimClock {
    start: Instant,
    last_stamp: Option<DateTime<Utc>>,
}

impl SimClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            last_stamp: None,
        }
    }

    /// Current simulated hour of day in `[0, 24)`.
    pub fn hour(&self) -> f64 {
        hour_at(self.start.elapsed())
    }

    /// Wall-clock time for the next payload, never earlier than the previous one.
    pub fn stamp(&mut self) -> DateTime<Utc> {
        self.stamp_at(Utc::now())
    }

    pub fn stamp_at(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = match self.last_stamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

pub fn hour_at(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() / SECONDS_PER_SIM_HOUR) % 24.0
}
