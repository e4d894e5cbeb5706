//! [`Watchdog`] – stall detector for the utterance in flight.
//!
//! The kiosk speaks one utterance at a time.  Each one is armed with a
//! deadline when it is handed to the engine and disarmed when the engine
//! reports completion.  If it never does, [`Watchdog::expired`] names the
//! stalled utterance and the supervisor forces the kiosk back to a
//! known-good state.
//!
//! [`WatchdogPolicy`] turns an utterance into a deadline proportional to its
//! length.

use std::time::{Duration, Instant};

use kiosk_types::UtteranceId;

// ────────────────────────────────────────────────────────────────────────────
// Policy
// ────────────────────────────────────────────────────────────────────────────

/// How long an utterance is allowed to take before it is considered stalled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchdogPolicy {
    /// Cost per character of spoken text.
    pub per_char: Duration,
    /// Fixed allowance added to every utterance.
    pub floor: Duration,
}

impl Default for WatchdogPolicy {
    fn default() -> Self {
        Self {
            per_char: Duration::from_millis(200),
            floor: Duration::from_millis(5000),
        }
    }
}

impl WatchdogPolicy {
    /// `chars(text) × per_char + floor`.
    ///
    /// ```
    /// use std::time::Duration;
    /// use kiosk_kernel::watchdog::WatchdogPolicy;
    ///
    /// let policy = WatchdogPolicy::default();
    /// assert_eq!(policy.budget_for("hello"), Duration::from_millis(6000));
    /// ```
    pub fn budget_for(&self, text: &str) -> Duration {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        self.per_char.saturating_mul(chars).saturating_add(self.floor)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Watchdog
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Armed {
    utterance: UtteranceId,
    armed_at: Instant,
    timeout: Duration,
}

/// Watches at most one utterance and detects when it stalls.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use kiosk_kernel::watchdog::Watchdog;
/// use kiosk_types::UtteranceId;
///
/// let start = Instant::now();
/// let mut wd = Watchdog::new();
/// wd.arm(UtteranceId(1), Duration::from_secs(6), start);
///
/// assert_eq!(wd.expired(start), None);
/// assert_eq!(wd.expired(start + Duration::from_secs(7)), Some(UtteranceId(1)));
/// ```
#[derive(Debug, Default)]
pub struct Watchdog {
    armed: Option<Armed>,
}

impl Watchdog {
    /// Create a watchdog with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `utterance` for at most `timeout` from `now`, replacing
    /// whatever was watched before.
    pub fn arm(&mut self, utterance: UtteranceId, timeout: Duration, now: Instant) {
        self.armed = Some(Armed {
            utterance,
            armed_at: now,
            timeout,
        });
    }

    /// Stop watching.
    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// The watched utterance, if it has exceeded its deadline at `now`.
    pub fn expired(&self, now: Instant) -> Option<UtteranceId> {
        self.armed
            .filter(|a| now.saturating_duration_since(a.armed_at) > a.timeout)
            .map(|a| a.utterance)
    }
}
