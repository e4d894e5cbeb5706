//! [`Deadline`] – re-armable one-shot timer.
//!
//! The deadline does not own a thread or a task. Whoever drives the kiosk
//! polls [`Deadline::expired`] on every tick and decides what to do; re-arming
//! simply moves the due time forward by one full period.

use std::time::{Duration, Instant};

/// A one-shot timer polled against an explicit `now`.
#[derive(Debug, Clone)]
pub struct Deadline {
    period: Duration,
    due: Option<Instant>,
}

impl Deadline {
    /// Create a disarmed deadline that fires `period` after each arming.
    pub fn new(period: Duration) -> Self {
        Self { period, due: None }
    }

    /// Arm (or re-arm) the deadline to fire one full period after `now`.
    ///
    /// A period too long for the platform clock to represent leaves the
    /// deadline disarmed; it could never be reached anyway.
    pub fn arm(&mut self, now: Instant) {
        self.due = now.checked_add(self.period);
    }

    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    /// `true` once `now` has reached the due time of an armed deadline.
    pub fn expired(&self, now: Instant) -> bool {
        self.due.is_some_and(|due| now >= due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_deadline_is_disarmed() {
        let d = Deadline::new(Duration::from_secs(30));
        assert_eq!(d.due(), None);
        assert!(!d.expired(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn expires_after_period() {
        let start = Instant::now();
        let mut d = Deadline::new(Duration::from_secs(30));
        d.arm(start);
        assert!(!d.expired(start + Duration::from_secs(29)));
        assert!(d.expired(start + Duration::from_secs(30)));
    }

    #[test]
    fn rearm_pushes_due_time_forward() {
        let start = Instant::now();
        let mut d = Deadline::new(Duration::from_secs(30));
        d.arm(start);
        d.arm(start + Duration::from_secs(29));
        assert!(!d.expired(start + Duration::from_secs(58)));
        assert!(d.expired(start + Duration::from_secs(59)));
    }

    #[test]
    fn unrepresentable_period_never_fires() {
        let start = Instant::now();
        let mut d = Deadline::new(Duration::from_secs(u64::MAX));
        d.arm(start);
        assert_eq!(d.due(), None);
        assert!(!d.expired(start + Duration::from_secs(3600)));
    }
}
