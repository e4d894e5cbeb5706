//! [`SpeechCoordinator`] – one voice, one avatar, no stuck states.
//!
//! The coordinator owns the single outstanding utterance.  It:
//!
//! * cancels the previous utterance before starting a new one, so the newest
//!   request always wins;
//! * maps engine lifecycle callbacks onto avatar states (`Talking` on start,
//!   `Idle` on end or error);
//! * ignores callbacks for utterances that are no longer current, so a late
//!   "end" from a cancelled answer cannot finish the answer that replaced it;
//! * arms the [`Watchdog`] for each utterance, sized by [`WatchdogPolicy`],
//!   and forces completion when the engine never reports back.
//!
//! Each utterance carries an [`UtterancePurpose`] that is handed back on
//! completion, so the session knows what just finished.

use std::sync::Arc;
use std::time::Instant;

use kiosk_kernel::{Watchdog, WatchdogPolicy};
use kiosk_middleware::{Display, SpeechEngine};
use kiosk_types::{AvatarState, KioskError, Language, SpeechRequest, UtteranceId};
use tracing::{debug, info, warn};

/// Characters stripped before text reaches the engine.
const UNSPOKEN_CHARS: [char; 3] = ['*', '#', '-'];

/// Why an utterance was spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtterancePurpose {
    Greeting,
    Answer,
    /// A "did you mean" prompt awaiting confirm / deny.
    Clarification,
}

#[derive(Debug, Clone, Copy)]
struct Outstanding {
    id: UtteranceId,
    purpose: UtterancePurpose,
}

/// Remove markup characters the engine would otherwise read aloud.
pub fn sanitize_for_speech(text: &str) -> String {
    text.chars().filter(|c| !UNSPOKEN_CHARS.contains(c)).collect()
}

/// Preferred voices for `language`, best first.
pub fn voice_hints(language: Language) -> Vec<String> {
    let hints: &[&str] = match language {
        Language::Thai => &["Achara", "Google ภาษาไทย"],
        Language::English => &["Google US English", "English"],
    };
    hints.iter().map(|h| h.to_string()).collect()
}

/// Serialises spoken output and drives the avatar.
pub struct SpeechCoordinator {
    engine: Arc<dyn SpeechEngine>,
    display: Arc<dyn Display>,
    watchdog: Watchdog,
    policy: WatchdogPolicy,
    volume: f32,
    current: Option<Outstanding>,
    next_id: u64,
}

impl SpeechCoordinator {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        display: Arc<dyn Display>,
        policy: WatchdogPolicy,
    ) -> Self {
        Self {
            engine,
            display,
            watchdog: Watchdog::new(),
            policy,
            volume: 1.0,
            current: None,
            next_id: 1,
        }
    }

    /// Pass-through engine volume in `[0.0, 1.0]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<UtteranceId> {
        self.current.map(|o| o.id)
    }

    /// Speak `text`, cancelling anything still outstanding.
    ///
    /// # Errors
    ///
    /// Returns the engine's error when it refuses the request; nothing is
    /// outstanding afterwards and the avatar is back to idle.
    pub fn say(
        &mut self,
        text: &str,
        language: Language,
        purpose: UtterancePurpose,
        now: Instant,
    ) -> Result<UtteranceId, KioskError> {
        if self.current.is_some() {
            self.cancel();
        }

        let id = UtteranceId(self.next_id);
        self.next_id += 1;

        let request = SpeechRequest {
            utterance: id,
            text: sanitize_for_speech(text),
            language,
            voice_hints: voice_hints(language),
            volume: self.volume,
        };
        let budget = self.policy.budget_for(&request.text);

        if let Err(e) = self.engine.speak(&request) {
            warn!(utterance = %id, error = %e, "speech engine rejected request");
            self.display.set_avatar_state(AvatarState::Idle);
            return Err(e);
        }

        self.watchdog.arm(id, budget, now);
        self.current = Some(Outstanding { id, purpose });
        debug!(utterance = %id, ?purpose, budget_ms = budget.as_millis() as u64, "utterance queued");
        Ok(id)
    }

    /// Engine reported that `id` began playing.
    pub fn on_started(&mut self, id: UtteranceId) -> bool {
        if !self.is_current(id) {
            debug!(utterance = %id, "ignoring start of stale utterance");
            return false;
        }
        self.display.set_avatar_state(AvatarState::Talking);
        true
    }

    /// Engine reported that `id` finished.
    ///
    /// Returns the purpose when `id` was the current utterance.
    pub fn on_finished(&mut self, id: UtteranceId) -> Option<UtterancePurpose> {
        if !self.is_current(id) {
            debug!(utterance = %id, "ignoring end of stale utterance");
            return None;
        }
        self.complete()
    }

    /// Engine reported an error for `id`. Treated as completion.
    pub fn on_failed(&mut self, id: UtteranceId, message: &str) -> Option<UtterancePurpose> {
        if !self.is_current(id) {
            debug!(utterance = %id, "ignoring error of stale utterance");
            return None;
        }
        warn!(utterance = %id, error = message, "speech engine error");
        self.complete()
    }

    /// Force-complete the current utterance when its watchdog has expired.
    pub fn check_watchdog(&mut self, now: Instant) -> Option<UtterancePurpose> {
        let current = self.current?;
        if self.watchdog.expired(now) != Some(current.id) {
            return None;
        }
        warn!(utterance = %current.id, "speech never finished; forcing completion");
        self.engine.cancel();
        self.complete()
    }

    /// Stop whatever is being spoken. Late callbacks for it are ignored.
    pub fn cancel(&mut self) {
        if let Some(outstanding) = self.current.take() {
            info!(utterance = %outstanding.id, "cancelling utterance");
            self.engine.cancel();
        }
        self.watchdog.disarm();
        self.display.set_avatar_state(AvatarState::Idle);
    }

    fn is_current(&self, id: UtteranceId) -> bool {
        self.current.is_some_and(|o| o.id == id)
    }

    fn complete(&mut self) -> Option<UtterancePurpose> {
        let outstanding = self.current.take()?;
        self.watchdog.disarm();
        self.display.set_avatar_state(AvatarState::Idle);
        Some(outstanding.purpose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDisplay, RecordingSpeech};
    use std::time::Duration;

    fn coordinator() -> (SpeechCoordinator, Arc<RecordingSpeech>, Arc<RecordingDisplay>) {
        let speech = Arc::new(RecordingSpeech::default());
        let display = Arc::new(RecordingDisplay::default());
        let coordinator =
            SpeechCoordinator::new(speech.clone(), display.clone(), WatchdogPolicy::default());
        (coordinator, speech, display)
    }

    #[test]
    fn sanitize_strips_markup() {
        assert_eq!(sanitize_for_speech("**Counter** #3 - left"), "Counter 3  left");
        assert_eq!(sanitize_for_speech("ช่อง 3"), "ช่อง 3");
    }

    #[test]
    fn request_carries_language_hints_and_clean_text() {
        let (mut c, speech, _) = coordinator();
        c.say("# ช่อง 3", Language::Thai, UtterancePurpose::Answer, Instant::now())
            .unwrap();
        let req = speech.last_request().unwrap();
        assert_eq!(req.text, " ช่อง 3");
        assert_eq!(req.language, Language::Thai);
        assert_eq!(req.voice_hints[0], "Achara");
    }

    #[test]
    fn lifecycle_drives_avatar() {
        let (mut c, _, display) = coordinator();
        let id = c
            .say("hello", Language::English, UtterancePurpose::Greeting, Instant::now())
            .unwrap();
        assert!(c.on_started(id));
        assert_eq!(display.last_avatar(), Some(AvatarState::Talking));
        assert_eq!(c.on_finished(id), Some(UtterancePurpose::Greeting));
        assert_eq!(display.last_avatar(), Some(AvatarState::Idle));
        assert!(!c.is_speaking());
    }

    #[test]
    fn new_request_cancels_previous_and_ignores_its_late_end() {
        let (mut c, speech, _) = coordinator();
        let now = Instant::now();
        let first = c
            .say("first", Language::English, UtterancePurpose::Answer, now)
            .unwrap();
        let second = c
            .say("second", Language::English, UtterancePurpose::Answer, now)
            .unwrap();
        assert_eq!(speech.cancel_count(), 1);
        assert_eq!(c.on_finished(first), None);
        assert_eq!(c.current(), Some(second));
        assert_eq!(c.on_finished(second), Some(UtterancePurpose::Answer));
    }

    #[test]
    fn watchdog_forces_completion() {
        let (mut c, speech, display) = coordinator();
        let start = Instant::now();
        // 5 chars × 200 ms + 5000 ms = 6 s.
        let id = c
            .say("hello", Language::English, UtterancePurpose::Answer, start)
            .unwrap();
        c.on_started(id);
        assert_eq!(c.check_watchdog(start + Duration::from_secs(6)), None);
        assert_eq!(
            c.check_watchdog(start + Duration::from_millis(6001)),
            Some(UtterancePurpose::Answer)
        );
        assert!(!c.is_speaking());
        assert_eq!(speech.cancel_count(), 1);
        assert_eq!(display.last_avatar(), Some(AvatarState::Idle));
        // The engine finally reports back; nothing happens.
        assert_eq!(c.on_finished(id), None);
    }

    #[test]
    fn watchdog_follows_the_newest_utterance() {
        let (mut c, _, _) = coordinator();
        let start = Instant::now();
        c.say("hello", Language::English, UtterancePurpose::Answer, start)
            .unwrap();
        let later = start + Duration::from_secs(5);
        let second = c
            .say("hello", Language::English, UtterancePurpose::Greeting, later)
            .unwrap();

        // The replaced utterance's budget runs out; the new one is untouched.
        assert_eq!(c.check_watchdog(start + Duration::from_millis(6001)), None);
        assert_eq!(c.current(), Some(second));
        assert_eq!(
            c.check_watchdog(later + Duration::from_millis(6001)),
            Some(UtterancePurpose::Greeting)
        );
    }

    #[test]
    fn engine_refusal_leaves_nothing_outstanding() {
        let (mut c, speech, _) = coordinator();
        speech.fail_next();
        let result = c.say("hello", Language::English, UtterancePurpose::Answer, Instant::now());
        assert!(matches!(result, Err(KioskError::Speech(_))));
        assert!(!c.is_speaking());
    }

    #[test]
    fn failure_counts_as_completion() {
        let (mut c, _, _) = coordinator();
        let id = c
            .say("hello", Language::English, UtterancePurpose::Clarification, Instant::now())
            .unwrap();
        assert_eq!(c.on_failed(id, "audio device lost"), Some(UtterancePurpose::Clarification));
    }
}
