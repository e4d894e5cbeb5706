//! Presence debouncing.
//!
//! Raw sensor output flickers: a visitor leans out of frame for a moment, a
//! passer-by crosses the lens, the classifier drops a frame.  Both entering
//! and leaving presence therefore require *sustained* evidence.
//!
//! ## State machine
//!
//! ```text
//!            positive                     positive, now - since >= dwell
//!  NoOne ─────────────▶ Tracking(since) ─────────────────────────────────▶ Confirmed
//!    ▲   (Detected)          │                   (Confirmed)                   │
//!    │                       │ now - last_seen >= clear                        │
//!    └───────────────────────┴─────────────────────────────────────────────────┘
//!                                          (Cleared)
//! ```
//!
//! * The clear threshold is measured from the most recent positive sample,
//!   so a short gap while `Tracking` does not restart the dwell.
//! * A positive sample while `Confirmed` only refreshes `last_seen`; it never
//!   re-confirms the same visitor.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use kiosk_perception::presence::{DebounceConfig, PresenceDebouncer, PresenceEvent};
//!
//! let t0 = Instant::now();
//! let mut debouncer = PresenceDebouncer::new(DebounceConfig::default());
//!
//! assert!(matches!(debouncer.observe(true, t0), Some(PresenceEvent::Detected { .. })));
//! assert_eq!(debouncer.observe(true, t0 + Duration::from_millis(1600)), Some(PresenceEvent::Confirmed));
//! // Still there – no second confirmation.
//! assert_eq!(debouncer.observe(true, t0 + Duration::from_millis(2000)), None);
//! ```

use std::time::{Duration, Instant};

use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Dwell and clear thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebounceConfig {
    /// Sustained positive evidence required before a visitor is confirmed.
    pub dwell: Duration,
    /// Sustained negative evidence required before a visitor is cleared.
    pub clear: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            dwell: Duration::from_millis(1500),
            clear: Duration::from_millis(15_000),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State & events
// ─────────────────────────────────────────────────────────────────────────────

/// Current belief about the space in front of the kiosk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    NoOne,
    /// Someone has been seen since `since` but not yet for the full dwell.
    Tracking { since: Instant, last_seen: Instant },
    /// A visitor is confirmed present.
    Confirmed { since: Instant, last_seen: Instant },
}

/// Discrete events emitted by [`PresenceDebouncer::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    /// First positive sample of a possible visit.
    Detected { since: Instant },
    /// The visitor has dwelled long enough to be greeted.
    Confirmed,
    /// The visitor (confirmed or merely tracked) has gone.
    Cleared,
}

// ─────────────────────────────────────────────────────────────────────────────
// PresenceDebouncer
// ─────────────────────────────────────────────────────────────────────────────

/// Dwell/clear debouncer over a stream of boolean presence samples.
#[derive(Debug, Clone)]
pub struct PresenceDebouncer {
    config: DebounceConfig,
    state: PresenceState,
}

impl PresenceDebouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            state: PresenceState::NoOne,
        }
    }

    pub fn config(&self) -> DebounceConfig {
        self.config
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// `true` while a visitor is being tracked or is confirmed.
    pub fn someone_present(&self) -> bool {
        !matches!(self.state, PresenceState::NoOne)
    }

    /// Feed one sample taken at `now`.
    ///
    /// Returns the event caused by this sample, if any.  Samples are
    /// expected in non-decreasing time order; an out-of-order timestamp is
    /// treated as zero elapsed time.
    pub fn observe(&mut self, person_seen: bool, now: Instant) -> Option<PresenceEvent> {
        let (next, event) = match (self.state, person_seen) {
            (PresenceState::NoOne, true) => (
                PresenceState::Tracking {
                    since: now,
                    last_seen: now,
                },
                Some(PresenceEvent::Detected { since: now }),
            ),
            (PresenceState::NoOne, false) => (PresenceState::NoOne, None),

            (PresenceState::Tracking { since, .. }, true) => {
                if now.saturating_duration_since(since) >= self.config.dwell {
                    (
                        PresenceState::Confirmed {
                            since,
                            last_seen: now,
                        },
                        Some(PresenceEvent::Confirmed),
                    )
                } else {
                    (
                        PresenceState::Tracking {
                            since,
                            last_seen: now,
                        },
                        None,
                    )
                }
            }
            (PresenceState::Confirmed { since, .. }, true) => (
                PresenceState::Confirmed {
                    since,
                    last_seen: now,
                },
                None,
            ),

            (
                PresenceState::Tracking { last_seen, .. } | PresenceState::Confirmed { last_seen, .. },
                false,
            ) => {
                if now.saturating_duration_since(last_seen) >= self.config.clear {
                    (PresenceState::NoOne, Some(PresenceEvent::Cleared))
                } else {
                    (self.state, None)
                }
            }
        };

        if let Some(ev) = event {
            debug!(event = ?ev, from = ?self.state, to = ?next, "presence transition");
        }
        self.state = next;
        event
    }

    /// Forget any tracked visitor without emitting an event.
    pub fn reset(&mut self) {
        self.state = PresenceState::NoOne;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
