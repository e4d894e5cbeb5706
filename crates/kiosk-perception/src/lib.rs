//! `kiosk-perception` – Presence layer.
//!
//! Turns a noisy per-frame "is someone there?" signal into the two discrete
//! facts the session cares about: a visitor has arrived and stayed long
//! enough to greet, and that visitor has really gone.
//!
//! # Modules
//!
//! - [`presence`] – [`PresenceDebouncer`][presence::PresenceDebouncer]:
//!   a dwell/clear state machine that emits at most one confirmation and one
//!   clearance per visit.
//! - [`detection`] – [`PresenceSource`][detection::PresenceSource] and
//!   [`PersonFilter`][detection::PersonFilter]: adapt an object classifier's
//!   detections (or any boolean sensor) into
//!   [`PresenceObservation`][kiosk_types::PresenceObservation] samples.

pub mod detection;
pub mod presence;

pub use detection::{Detection, DetectorSource, ObjectDetector, PersonFilter, PresenceSource};
pub use presence::{DebounceConfig, PresenceDebouncer, PresenceEvent, PresenceState};
