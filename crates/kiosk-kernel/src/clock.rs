//! Injectable time source.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Timelike;

/// Source of monotonic time and the local wall-clock hour.
pub trait Clock: Send + Sync {
    /// Monotonic "now" used for every timeout and dwell comparison.
    fn now(&self) -> Instant;

    /// Local hour of day in `0..24`, used for time-of-day greetings.
    fn local_hour(&self) -> u32;
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn local_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

#[derive(Debug)]
struct ManualTime {
    now: Instant,
    hour: u32,
}

/// A clock that only moves when told to.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use kiosk_kernel::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(29));
/// assert_eq!(clock.now() - start, Duration::from_secs(29));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<ManualTime>,
}

impl ManualClock {
    /// Start at the current instant, 10 o'clock in the morning.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ManualTime {
                now: Instant::now(),
                hour: 10,
            }),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut t = self.lock();
        t.now += by;
    }

    /// Set the hour reported by [`Clock::local_hour`].
    pub fn set_hour(&self, hour: u32) {
        self.lock().hour = hour % 24;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualTime> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.lock().now
    }

    fn local_hour(&self) -> u32 {
        self.lock().hour
    }
}
