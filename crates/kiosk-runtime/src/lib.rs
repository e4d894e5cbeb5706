//! `kiosk-runtime` – The Session Engine.
//!
//! Turns presence, queries and speech callbacks into greetings, answers and
//! a screen that reliably returns to its welcome state.
//!
//! # Modules
//!
//! - [`session`] – [`SessionController`][session::SessionController]: the
//!   central state machine (Idle → Engaging → Listening ⇄ Busy).  Owns the
//!   idle deadline, the greeted flag, the active language and any pending
//!   "did you mean" prompt; every change goes through
//!   [`SessionController::handle`][session::SessionController::handle].
//! - [`speech`] – [`SpeechCoordinator`][speech::SpeechCoordinator]: one
//!   outstanding utterance at a time, avatar state from engine callbacks,
//!   and a per-utterance watchdog so a silent engine can never wedge the
//!   kiosk.
//! - [`greeting`] – [`GreetingPicker`][greeting::GreetingPicker]:
//!   time-of-day greetings without immediate repeats.
//! - [`kiosk_loop`] – [`KioskLoop`][kiosk_loop::KioskLoop]: the async
//!   driver that subscribes to the event bus, debounces presence, loads the
//!   knowledge table in the background and ticks the session.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console or
//!   JSON logs, plus OTLP span export when `OTEL_EXPORTER_OTLP_ENDPOINT` is
//!   set.

pub mod greeting;
pub mod kiosk_loop;
pub mod session;
pub mod speech;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use greeting::{DayPart, GreetingPicker};
pub use kiosk_loop::{KioskLoop, KioskLoopConfig, spawn_presence_poller};
pub use session::{SessionConfig, SessionController, SessionInput, SessionPhase};
pub use speech::{SpeechCoordinator, UtterancePurpose, sanitize_for_speech, voice_hints};
pub use telemetry::{TracerProviderGuard, init_tracing};
