//! Terminal stand-ins for the kiosk's screen, voice and camera.
//!
//! - [`ConsoleDisplay`] prints response text, the avatar state and the
//!   numbered choice row.
//! - [`ConsoleSpeech`] prints each utterance and simulates playback time,
//!   publishing start / end callbacks on the event bus like a real engine.
//! - [`SimulatedPresence`] reports whatever the operator last set with
//!   `/arrive` and `/leave`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use colored::Colorize;
use kiosk_middleware::{Choice, ChoiceAction, Display, EventBus, SpeechEngine, Topic};
use kiosk_perception::PresenceSource;
use kiosk_types::{
    AvatarState, Event, EventPayload, KioskError, PresenceObservation, SpeechRequest,
};
use tokio::task::JoinHandle;
use tracing::debug;

const SOURCE: &str = "kiosk-cli::console";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// ConsoleDisplay
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ConsoleDisplay {
    choices: Mutex<Vec<Choice>>,
    assets: Mutex<HashMap<AvatarState, String>>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The choice shown as number `n` (1-based).
    pub fn choice(&self, n: usize) -> Option<Choice> {
        n.checked_sub(1).and_then(|i| lock(&self.choices).get(i).cloned())
    }
}

impl Display for ConsoleDisplay {
    fn display_text(&self, text: &str) {
        println!("\n  {} {}", "▌".cyan(), text.bold());
    }

    fn set_avatar_state(&self, state: AvatarState) {
        let assets = lock(&self.assets);
        match assets.get(&state) {
            Some(asset) => println!("  {}", format!("[avatar: {} ({asset})]", state.label()).dimmed()),
            None => println!("  {}", format!("[avatar: {}]", state.label()).dimmed()),
        }
    }

    fn show_choices(&self, choices: &[Choice]) {
        *lock(&self.choices) = choices.to_vec();
        if choices.is_empty() {
            return;
        }
        for (i, choice) in choices.iter().enumerate() {
            let marker = match choice.action {
                ChoiceAction::Ask(_) => "?",
                ChoiceAction::Confirm => "✓",
                ChoiceAction::Deny => "✗",
            };
            println!("    {} {} {}", format!("{}.", i + 1).cyan(), marker.dimmed(), choice.label);
        }
    }

    fn set_avatar_assets(&self, assets: &[(AvatarState, String)]) {
        *lock(&self.assets) = assets.iter().cloned().collect();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ConsoleSpeech
// ─────────────────────────────────────────────────────────────────────────────

/// Simulated text-to-speech: prints the text and "speaks" for a duration
/// proportional to its length.
pub struct ConsoleSpeech {
    bus: EventBus,
    per_char: Duration,
    playing: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleSpeech {
    pub fn new(bus: EventBus, per_char: Duration) -> Self {
        Self {
            bus,
            per_char,
            playing: Mutex::new(None),
        }
    }

    fn playback_time(&self, text: &str) -> Duration {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        self.per_char.saturating_mul(chars)
    }
}

impl SpeechEngine for ConsoleSpeech {
    fn speak(&self, request: &SpeechRequest) -> Result<(), KioskError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| KioskError::Speech(format!("no async runtime: {e}")))?;

        let voice = request.voice_hints.first().map(String::as_str).unwrap_or("default");
        println!(
            "  {} {}",
            format!("🔊 [{} · {voice}]", request.language.speech_locale()).magenta(),
            request.text.italic()
        );

        let bus = self.bus.clone();
        let id = request.utterance;
        let duration = self.playback_time(&request.text);
        let task = handle.spawn(async move {
            let _ = bus.publish_to(Topic::Speech, Event::new(SOURCE, EventPayload::SpeechStarted(id)));
            tokio::time::sleep(duration).await;
            let _ = bus.publish_to(Topic::Speech, Event::new(SOURCE, EventPayload::SpeechEnded(id)));
        });

        if let Some(previous) = lock(&self.playing).replace(task) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel(&self) {
        if let Some(task) = lock(&self.playing).take() {
            debug!("console speech cancelled");
            task.abort();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SimulatedPresence
// ─────────────────────────────────────────────────────────────────────────────

/// A presence source toggled from the REPL.
pub struct SimulatedPresence {
    someone_there: Arc<AtomicBool>,
}

impl SimulatedPresence {
    pub fn new(someone_there: Arc<AtomicBool>) -> Self {
        Self { someone_there }
    }
}

impl PresenceSource for SimulatedPresence {
    fn id(&self) -> &str {
        "simulated"
    }

    fn sample(&mut self) -> Result<PresenceObservation, KioskError> {
        Ok(if self.someone_there.load(Ordering::SeqCst) {
            PresenceObservation::seen()
        } else {
            PresenceObservation::absent()
        })
    }
}
