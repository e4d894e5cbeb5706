//! `kiosk-middleware` – The Nervous System
//!
//! Routes asynchronous events between the sensor, the visitor-facing input
//! devices, the speech engine and the session controller without caring
//! about the data's meaning.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.
//! - [`adapter`] – The boundary traits ([`SpeechEngine`], [`Display`]) that
//!   concrete output devices implement, plus the [`Choice`] buttons a
//!   [`Display`] renders.

pub mod adapter;
pub mod bus;

pub use adapter::{Choice, ChoiceAction, Display, SpeechEngine};
pub use bus::{EventBus, Topic, TopicReceiver};
