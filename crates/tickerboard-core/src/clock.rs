//! Time source capability.
//!
//! Everything that needs "now" (cache expiry, refresh tokens, snapshot
//! timestamps) takes a [`Clock`] instead of reading the system time directly.

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use time::OffsetDateTime;

use crate::UtcDateTime;

pub trait Clock: Send + Sync + Debug {
    /// Monotonic instant used for TTL arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock time.
    fn now_utc(&self) -> UtcDateTime;
}

/// Clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: OffsetDateTime,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(OffsetDateTime::UNIX_EPOCH)
    }

    pub fn starting_at(wall_origin: OffsetDateTime) -> Self {
        Self {
            origin: Instant::now(),
            wall_origin,
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Start at the given unix timestamp; out-of-range values fall back to the epoch.
    pub fn starting_at_unix(seconds: i64) -> Self {
        Self::starting_at(
            OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH),
        )
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self
            .elapsed
            .lock()
            .expect("manual clock lock is not poisoned");
        *elapsed += by;
    }

    fn elapsed(&self) -> Duration {
        *self
            .elapsed
            .lock()
            .expect("manual clock lock is not poisoned")
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn now_utc(&self) -> UtcDateTime {
        let elapsed = time::Duration::try_from(self.elapsed()).unwrap_or(time::Duration::ZERO);
        UtcDateTime::from_offset_datetime(self.wall_origin + elapsed).unwrap_or_else(|_| UtcDateTime::now())
    }
}
