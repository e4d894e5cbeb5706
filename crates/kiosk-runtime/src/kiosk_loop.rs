//! [`KioskLoop`] – the async driver.
//!
//! Wires the event bus to the session:
//!
//! 1. **Sensor** – raw presence samples go through the
//!    [`PresenceDebouncer`]; the resulting discrete events drive the
//!    [`SessionController`].  A sensor fault clears presence so the idle
//!    reset is never blocked by a dead camera.
//! 2. **Input** – queries, taps, language switches and clarification
//!    replies are forwarded as-is.
//! 3. **Speech** – engine lifecycle callbacks are forwarded with their
//!    utterance id.
//! 4. **Tick** – a fixed interval checks the idle deadline and the speech
//!    watchdog.
//!
//! The knowledge table is loaded on a background task with
//! [`fetch_with_retry`]; queries that arrive first get "please wait".
//!
//! Everything runs on one task, so session state is never touched
//! concurrently.

use std::sync::Arc;
use std::time::Duration;

use kiosk_kernel::Clock;
use kiosk_knowledge::{KnowledgeSource, fetch_with_retry};
use kiosk_middleware::{EventBus, Topic};
use kiosk_perception::{DebounceConfig, PresenceDebouncer, PresenceEvent, PresenceSource};
use kiosk_types::{Event, EventPayload, KioskError};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::session::{SessionController, SessionInput};

/// Event source tag for the presence poller.
const POLLER_SOURCE: &str = "kiosk-runtime::presence";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Timing for [`KioskLoop`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KioskLoopConfig {
    pub debounce: DebounceConfig,
    /// How often the idle deadline and speech watchdog are checked.
    pub tick_interval: Duration,
    /// How often the presence source is sampled.
    pub presence_poll_interval: Duration,
    /// Delay between failed knowledge fetches.
    pub knowledge_retry_delay: Duration,
}

impl Default for KioskLoopConfig {
    fn default() -> Self {
        Self {
            debounce: DebounceConfig::default(),
            tick_interval: Duration::from_millis(250),
            presence_poll_interval: Duration::from_millis(500),
            knowledge_retry_delay: Duration::from_secs(5),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Presence poller
// ─────────────────────────────────────────────────────────────────────────────

/// Consecutive failed samples, so a flaky sensor warns once per outage
/// rather than on every poll.
#[derive(Debug, Default)]
struct FailureStreak {
    count: u32,
}

impl FailureStreak {
    /// Record a failure; `true` for the first failure of a streak.
    fn fail(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.count == 1
    }

    /// Record a success; the length of the streak it ended, if any.
    fn succeed(&mut self) -> Option<u32> {
        (self.count > 0).then(|| std::mem::take(&mut self.count))
    }
}

/// Sample `source` every `interval` and publish each observation to
/// [`Topic::Sensor`].
///
/// A permanent [`KioskError::Sensor`] publishes a `SensorFault` and stops
/// the poller; transient errors are logged (warn once, then debug) and
/// sampling continues.
pub fn spawn_presence_poller(
    bus: EventBus,
    mut source: Box<dyn PresenceSource>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut streak = FailureStreak::default();
        info!(source = source.id(), "presence poller started");
        loop {
            ticker.tick().await;
            match source.sample() {
                Ok(observation) => {
                    if let Some(failures) = streak.succeed() {
                        info!(source = source.id(), failures, "presence sensor recovered");
                    }
                    let event =
                        Event::new(POLLER_SOURCE, EventPayload::PresenceSample(observation));
                    if let Err(e) = bus.publish_to(Topic::Sensor, event) {
                        debug!(error = %e, "presence sample dropped");
                    }
                }
                Err(KioskError::Sensor {
                    component,
                    details,
                    permanent: true,
                }) => {
                    warn!(
                        component = %component,
                        details = %details,
                        "presence sensor unavailable; presence greetings disabled"
                    );
                    let fault = Event::new(
                        POLLER_SOURCE,
                        EventPayload::SensorFault {
                            component,
                            message: details,
                        },
                    );
                    let _ = bus.publish_to(Topic::Sensor, fault);
                    return;
                }
                Err(e) => {
                    if streak.fail() {
                        warn!(source = source.id(), error = %e, "presence sample failed");
                    } else {
                        debug!(source = source.id(), error = %e, "presence sample still failing");
                    }
                }
            }
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// KioskLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the session and feeds it from the bus.
pub struct KioskLoop {
    bus: EventBus,
    clock: Arc<dyn Clock>,
    config: KioskLoopConfig,
    debouncer: PresenceDebouncer,
    controller: SessionController,
    sensor_enabled: bool,
}

impl KioskLoop {
    pub fn new(
        bus: EventBus,
        clock: Arc<dyn Clock>,
        config: KioskLoopConfig,
        controller: SessionController,
    ) -> Self {
        Self {
            bus,
            clock,
            debouncer: PresenceDebouncer::new(config.debounce),
            config,
            controller,
            sensor_enabled: true,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// `false` once the presence sensor has reported a permanent fault.
    pub fn sensor_enabled(&self) -> bool {
        self.sensor_enabled
    }

    /// Route one bus event into the session.
    pub fn handle_event(&mut self, event: &Event) {
        match &event.payload {
            EventPayload::PresenceSample(observation) => {
                if !self.sensor_enabled {
                    return;
                }
                let now = self.clock.now();
                match self.debouncer.observe(observation.person_seen, now) {
                    Some(PresenceEvent::Detected { since }) => {
                        self.controller.handle(SessionInput::PresenceDetected { since });
                    }
                    Some(PresenceEvent::Confirmed) => {
                        self.controller.handle(SessionInput::PresenceConfirmed);
                    }
                    Some(PresenceEvent::Cleared) => {
                        self.controller.handle(SessionInput::PresenceCleared);
                    }
                    None => {}
                }
                if observation.person_seen {
                    self.controller.handle(SessionInput::PresenceSeen);
                }
            }
            EventPayload::SensorFault { component, message } => {
                warn!(component = %component, message = %message, "sensor fault");
                self.sensor_enabled = false;
                if self.debouncer.someone_present() {
                    self.debouncer.reset();
                    self.controller.handle(SessionInput::PresenceCleared);
                }
            }
            EventPayload::QuerySubmitted { text, origin } => {
                self.controller.handle(SessionInput::QuerySubmitted {
                    text: text.clone(),
                    origin: *origin,
                });
            }
            EventPayload::ClarificationReply { confirmed } => {
                self.controller.handle(SessionInput::ClarificationReply {
                    confirmed: *confirmed,
                });
            }
            EventPayload::ManualInteraction => {
                self.controller.handle(SessionInput::ManualInteraction);
            }
            EventPayload::LanguageChanged(language) => {
                self.controller.handle(SessionInput::LanguageChanged(*language));
            }
            EventPayload::SpeechStarted(id) => {
                self.controller.handle(SessionInput::SpeechStarted(*id));
            }
            EventPayload::SpeechEnded(id) => {
                self.controller.handle(SessionInput::SpeechEnded(*id));
            }
            EventPayload::SpeechFailed { utterance, message } => {
                self.controller.handle(SessionInput::SpeechFailed {
                    utterance: *utterance,
                    message: message.clone(),
                });
            }
        }
    }

    /// Periodic housekeeping.
    pub fn tick(&mut self) {
        self.controller.handle(SessionInput::Tick);
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// `presence` is optional: a kiosk without a camera still answers
    /// queries.
    pub async fn run(
        mut self,
        knowledge: Arc<dyn KnowledgeSource>,
        presence: Option<Box<dyn PresenceSource>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut sensor_rx = self.bus.subscribe_to(Topic::Sensor);
        let mut input_rx = self.bus.subscribe_to(Topic::Input);
        let mut speech_rx = self.bus.subscribe_to(Topic::Speech);

        let (knowledge_tx, mut knowledge_rx) = oneshot::channel();
        let retry_delay = self.config.knowledge_retry_delay;
        let fetch_task = tokio::spawn(async move {
            let result = fetch_with_retry(knowledge.as_ref(), retry_delay, None).await;
            let _ = knowledge_tx.send(result);
        });
        let mut knowledge_pending = true;

        let poller = presence.map(|source| {
            spawn_presence_poller(self.bus.clone(), source, self.config.presence_poll_interval)
        });
        if poller.is_none() {
            info!("no presence source; presence greetings disabled");
            self.sensor_enabled = false;
        }

        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.controller.reset_to_idle();
        info!("kiosk loop running");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                result = &mut knowledge_rx, if knowledge_pending => {
                    knowledge_pending = false;
                    match result {
                        Ok(Ok(table)) => self.controller.set_knowledge(table),
                        Ok(Err(e)) => warn!(error = %e, "knowledge table unavailable"),
                        Err(_) => warn!("knowledge loader stopped without a result"),
                    }
                }
                Some(event) = sensor_rx.recv() => self.handle_event(&event),
                Some(event) = input_rx.recv() => self.handle_event(&event),
                Some(event) = speech_rx.recv() => self.handle_event(&event),
                _ = ticker.tick() => self.tick(),
            }
        }

        fetch_task.abort();
        if let Some(poller) = poller {
            poller.abort();
        }
        info!("kiosk loop stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
