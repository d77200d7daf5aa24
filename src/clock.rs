use chrono::{Local, NaiveDateTime, Utc};
use std::sync::Mutex;

/// Wall-clock source. Check-ins compare local time of day, so `now` yields
/// naive local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Seconds since the Unix epoch. Expiry deadlines use this so they do
    /// not shift across DST changes.
    fn epoch_secs(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn epoch_secs(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Settable clock for tests and replays.
pub struct FixedClock {
    at: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at: Mutex::new(at) }
    }

    pub fn set(&self, at: NaiveDateTime) {
        if let Ok(mut guard) = self.at.lock() {
            *guard = at;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.at.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.at.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// The fixed instant read as UTC.
    fn epoch_secs(&self) -> i64 {
        self.now().and_utc().timestamp()
    }
}
