//! `kiosk-kernel` – Safety & Timing
//!
//! The brainstem of the kiosk. It does not think; it keeps time and makes
//! sure nothing waits forever.
//!
//! # Modules
//!
//! - [`clock`] – [`Clock`][clock::Clock]: the single source of "now" for every
//!   time-dependent decision, with a [`ManualClock`][clock::ManualClock] that
//!   tests advance by hand.
//! - [`deadline`] – [`Deadline`][deadline::Deadline]: a re-armable one-shot
//!   timer used for the session idle timeout.
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]:
//!   tracks a deadline for the in-flight utterance so a speech engine that never
//!   reports completion cannot leave the kiosk stuck.

pub mod clock;
pub mod deadline;
pub mod watchdog;

pub use clock::{Clock, ManualClock, SystemClock};
pub use deadline::Deadline;
pub use watchdog::{Watchdog, WatchdogPolicy};
