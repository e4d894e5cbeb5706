//! [`SessionController`] – the kiosk's session lifecycle.
//!
//! # Phases
//!
//! ```text
//!            presence confirmed,                greeting
//!            not greeted, not busy               finished
//!   Idle ───────────────────────────▶ Engaging ──────────▶ Listening
//!    ▲                                                     │   ▲
//!    │ idle deadline expired,                      query   │   │ answer finished
//!    │ nobody present, not busy,                         ▼   │
//!    │ not speaking                                       Busy
//!    └──────────────────────────────────────────────── (any phase)
//! ```
//!
//! All inputs arrive as [`SessionInput`] through [`SessionController::handle`].
//! The controller owns its [`SessionState`] outright; nothing else mutates
//! it.
//!
//! # Rules
//!
//! * One greeting per visit: `has_greeted` is only cleared by
//!   [`SessionInput::PresenceCleared`] or a reset to idle.  A visitor
//!   confirmed while the kiosk is still talking is greeted as soon as the
//!   current utterance ends.
//! * A new query always preempts: in-flight speech is cancelled and the new
//!   answer is spoken.  Late speech callbacks for the cancelled utterance are
//!   ignored by the [`SpeechCoordinator`].
//! * The idle deadline never resets the screen while someone is present,
//!   while busy, or while speech is outstanding; it re-arms instead.
//! * Manual interaction re-arms the idle deadline without changing phase.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kiosk_kernel::{Clock, Deadline, WatchdogPolicy};
use kiosk_knowledge::{Decision, KnowledgeTable, MatchResult, QueryLog, RankPolicy, messages, rank};
use kiosk_middleware::{Choice, ChoiceAction, Display, SpeechEngine};
use kiosk_types::{AvatarState, Language, QueryOrigin, UtteranceId};
use tracing::{debug, info, warn};

use crate::greeting::GreetingPicker;
use crate::speech::{SpeechCoordinator, UtterancePurpose};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for [`SessionController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Inactivity before the screen returns to the welcome state.
    pub idle_timeout: Duration,
    /// Language active at startup.
    pub default_language: Language,
    pub rank: RankPolicy,
    pub watchdog: WatchdogPolicy,
    /// Speech volume passed through to the engine.
    pub volume: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            default_language: Language::Thai,
            rank: RankPolicy::default(),
            watchdog: WatchdogPolicy::default(),
            volume: 1.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs & state
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    /// Greeting in progress.
    Engaging,
    /// Waiting for the visitor.
    Listening,
    /// Answer being computed or spoken.
    Busy,
}

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    /// Tracking began; someone is in front of the kiosk since `since`.
    PresenceDetected { since: Instant },
    /// A positive sample arrived.
    PresenceSeen,
    /// The visitor has dwelled long enough to be greeted.
    PresenceConfirmed,
    /// The visitor has left.
    PresenceCleared,
    QuerySubmitted { text: String, origin: QueryOrigin },
    ClarificationReply { confirmed: bool },
    SpeechStarted(UtteranceId),
    SpeechEnded(UtteranceId),
    SpeechFailed { utterance: UtteranceId, message: String },
    /// Tap, click or keypress.
    ManualInteraction,
    LanguageChanged(Language),
    /// Periodic check of the idle deadline and speech watchdog.
    Tick,
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    idle: Deadline,
    has_greeted: bool,
    presence_since: Option<Instant>,
    last_seen_at: Option<Instant>,
    language: Language,
    /// Confirmed visitor whose greeting waits for the current utterance.
    greet_pending: bool,
    /// Match awaiting a "did you mean" confirm / deny.
    pending_clarification: Option<MatchResult>,
}

impl SessionState {
    fn new(config: &SessionConfig) -> Self {
        Self {
            phase: SessionPhase::Idle,
            idle: Deadline::new(config.idle_timeout),
            has_greeted: false,
            presence_since: None,
            last_seen_at: None,
            language: config.default_language,
            greet_pending: false,
            pending_clarification: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionController
// ─────────────────────────────────────────────────────────────────────────────

/// The central session state machine.
pub struct SessionController {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    display: Arc<dyn Display>,
    speech: SpeechCoordinator,
    greetings: GreetingPicker,
    knowledge: Option<KnowledgeTable>,
    query_log: Option<Arc<dyn QueryLog>>,
    state: SessionState,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        engine: Arc<dyn SpeechEngine>,
        display: Arc<dyn Display>,
    ) -> Self {
        let mut speech = SpeechCoordinator::new(engine, display.clone(), config.watchdog);
        speech.set_volume(config.volume);
        Self {
            state: SessionState::new(&config),
            config,
            clock,
            display,
            speech,
            greetings: GreetingPicker::new(),
            knowledge: None,
            query_log: None,
        }
    }

    /// Replace the greeting picker (tests use a seeded one).
    pub fn with_greetings(mut self, greetings: GreetingPicker) -> Self {
        self.greetings = greetings;
        self
    }

    /// Record every submitted query to `log`.
    pub fn with_query_log(mut self, log: Arc<dyn QueryLog>) -> Self {
        self.query_log = Some(log);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn is_busy(&self) -> bool {
        self.state.phase == SessionPhase::Busy
    }

    pub fn has_greeted(&self) -> bool {
        self.state.has_greeted
    }

    pub fn someone_present(&self) -> bool {
        self.state.presence_since.is_some()
    }

    pub fn last_seen_at(&self) -> Option<Instant> {
        self.state.last_seen_at
    }

    pub fn language(&self) -> Language {
        self.state.language
    }

    pub fn idle_deadline(&self) -> Option<Instant> {
        self.state.idle.due()
    }

    pub fn awaiting_clarification(&self) -> bool {
        self.state.pending_clarification.is_some()
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_speaking()
    }

    pub fn knowledge(&self) -> Option<&KnowledgeTable> {
        self.knowledge.as_ref()
    }

    // ── Knowledge ────────────────────────────────────────────────────────────

    /// Install a freshly loaded table, replacing any previous one.
    pub fn set_knowledge(&mut self, table: KnowledgeTable) {
        let assets: Vec<(AvatarState, String)> =
            [AvatarState::Idle, AvatarState::Thinking, AvatarState::Talking]
                .into_iter()
                .filter_map(|state| table.avatar_asset(state).map(|a| (state, a.to_string())))
                .collect();
        if !assets.is_empty() {
            self.display.set_avatar_assets(&assets);
        }
        info!(entries = table.entry_count(), "knowledge table installed");
        self.knowledge = Some(table);
        if self.state.pending_clarification.is_none() {
            self.show_menu();
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    /// Apply one input.
    pub fn handle(&mut self, input: SessionInput) {
        let now = self.clock.now();
        match input {
            SessionInput::PresenceDetected { since } => {
                self.state.presence_since = Some(since);
                self.state.last_seen_at = Some(since);
            }
            SessionInput::PresenceSeen => {
                self.state.last_seen_at = Some(now);
            }
            SessionInput::PresenceConfirmed => self.on_presence_confirmed(now),
            SessionInput::PresenceCleared => {
                debug!("visitor left");
                self.state.has_greeted = false;
                self.state.greet_pending = false;
                self.state.presence_since = None;
            }
            SessionInput::QuerySubmitted { text, origin } => self.on_query(&text, origin, now),
            SessionInput::ClarificationReply { confirmed } => self.on_clarification(confirmed, now),
            SessionInput::SpeechStarted(id) => {
                self.speech.on_started(id);
            }
            SessionInput::SpeechEnded(id) => {
                if let Some(purpose) = self.speech.on_finished(id) {
                    self.on_utterance_done(purpose, now);
                }
            }
            SessionInput::SpeechFailed { utterance, message } => {
                if let Some(purpose) = self.speech.on_failed(utterance, &message) {
                    self.on_utterance_done(purpose, now);
                }
            }
            SessionInput::ManualInteraction => self.state.idle.arm(now),
            SessionInput::LanguageChanged(language) => self.on_language(language, now),
            SessionInput::Tick => self.on_tick(now),
        }
    }

    /// Return to the welcome screen.
    ///
    /// Cancels speech, forgets the visitor and any pending clarification,
    /// and restores the quick-question menu.  The active language is kept.
    /// Calling it twice leaves the same state as calling it once.
    pub fn reset_to_idle(&mut self) {
        self.speech.cancel();
        let language = self.state.language;
        self.state = SessionState::new(&self.config);
        self.state.language = language;
        self.display.set_avatar_state(AvatarState::Idle);
        self.display.display_text(messages::welcome(self.state.language));
        self.show_menu();
        info!("session reset to idle");
    }

    // ── Handlers ─────────────────────────────────────────────────────────────

    fn on_presence_confirmed(&mut self, now: Instant) {
        if self.state.presence_since.is_none() {
            self.state.presence_since = Some(now);
        }
        self.state.last_seen_at = Some(now);

        if self.state.has_greeted {
            debug!("visitor already greeted");
            return;
        }
        if !matches!(self.state.phase, SessionPhase::Idle | SessionPhase::Listening) {
            debug!(phase = ?self.state.phase, "greeting deferred until speech ends");
            self.state.greet_pending = true;
            return;
        }
        self.greet(now);
    }

    fn greet(&mut self, now: Instant) {
        self.state.has_greeted = true;
        self.state.greet_pending = false;
        self.state.phase = SessionPhase::Engaging;
        let text = self.greetings.pick(self.state.language, self.clock.local_hour());
        info!(language = %self.state.language, "greeting visitor");
        self.display.display_text(&text);
        self.speak(&text, UtterancePurpose::Greeting, now);
    }

    fn on_query(&mut self, text: &str, origin: QueryOrigin, now: Instant) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.state.idle.arm(now);
        // A visitor who is already asking does not need greeting.
        self.state.has_greeted = true;
        self.state.greet_pending = false;
        self.state.pending_clarification = None;
        if self.speech.is_speaking() {
            self.speech.cancel();
        }

        info!(query = text, ?origin, "query submitted");
        if let Some(log) = &self.query_log {
            log.record(text);
        }

        let language = self.state.language;
        let Some(table) = &self.knowledge else {
            self.state.phase = SessionPhase::Listening;
            self.display.display_text(messages::please_wait(language));
            return;
        };

        self.state.phase = SessionPhase::Busy;
        self.display.set_avatar_state(AvatarState::Thinking);
        let result = rank(text, table, language);
        debug!(score = result.score, key = %result.key_phrase, "ranked");

        match self.config.rank.decide(result) {
            Decision::Answer(m) => {
                self.show_menu();
                self.respond(&m.answer, UtterancePurpose::Answer, now);
            }
            Decision::Clarify(m) => {
                let prompt = messages::did_you_mean(language, &m.key_phrase);
                self.display.show_choices(&[
                    Choice {
                        label: messages::confirm_label(language).to_string(),
                        action: ChoiceAction::Confirm,
                    },
                    Choice {
                        label: messages::deny_label(language).to_string(),
                        action: ChoiceAction::Deny,
                    },
                ]);
                self.state.pending_clarification = Some(m);
                self.respond(&prompt, UtterancePurpose::Clarification, now);
            }
            Decision::NotFound => {
                self.show_menu();
                self.respond(messages::not_found(language), UtterancePurpose::Answer, now);
            }
        }
    }

    fn on_clarification(&mut self, confirmed: bool, now: Instant) {
        let Some(pending) = self.state.pending_clarification.take() else {
            debug!("clarification reply with nothing pending");
            return;
        };
        self.state.idle.arm(now);
        self.show_menu();
        if confirmed {
            self.speech.cancel();
            self.state.phase = SessionPhase::Busy;
            self.respond(&pending.answer, UtterancePurpose::Answer, now);
        } else {
            self.speech.cancel();
            self.state.phase = SessionPhase::Listening;
            self.display.display_text(messages::welcome(self.state.language));
        }
    }

    fn on_language(&mut self, language: Language, now: Instant) {
        info!(%language, "language changed");
        self.state.language = language;
        self.state.idle.arm(now);
        // The stored answer was ranked in the previous language.
        if self.state.pending_clarification.take().is_some() {
            debug!("clarification dropped on language change");
            if self.state.phase == SessionPhase::Listening {
                self.display.display_text(messages::welcome(language));
            }
        }
        if self.state.phase == SessionPhase::Idle {
            self.display.display_text(messages::welcome(language));
        }
        self.show_menu();
    }

    fn on_utterance_done(&mut self, purpose: UtterancePurpose, now: Instant) {
        debug!(?purpose, "utterance done");
        self.state.phase = SessionPhase::Listening;
        self.state.idle.arm(now);
        if self.state.greet_pending
            && self.state.presence_since.is_some()
            && !self.state.has_greeted
        {
            self.greet(now);
        }
    }

    fn on_tick(&mut self, now: Instant) {
        if let Some(purpose) = self.speech.check_watchdog(now) {
            warn!(?purpose, "speech watchdog expired; releasing session");
            self.on_utterance_done(purpose, now);
        }

        if !self.state.idle.expired(now) {
            return;
        }
        if self.someone_present() || self.is_busy() || self.speech.is_speaking() {
            debug!(
                present = self.someone_present(),
                busy = self.is_busy(),
                "idle deadline reached while engaged; re-arming"
            );
            self.state.idle.arm(now);
            return;
        }
        self.reset_to_idle();
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    /// Display and speak `text` as the response to the visitor.
    fn respond(&mut self, text: &str, purpose: UtterancePurpose, now: Instant) {
        self.display.display_text(text);
        self.speak(text, purpose, now);
    }

    fn speak(&mut self, text: &str, purpose: UtterancePurpose, now: Instant) {
        if self
            .speech
            .say(text, self.state.language, purpose, now)
            .is_err()
        {
            // Engine refused; the text is already on screen.
            self.on_utterance_done(purpose, now);
        }
    }

    fn show_menu(&self) {
        let choices: Vec<Choice> = self
            .knowledge
            .as_ref()
            .map(|t| t.quick_questions(self.state.language))
            .unwrap_or_default()
            .into_iter()
            .map(Choice::ask)
            .collect();
        self.display.show_choices(&choices);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDisplay, RecordingSpeech};
    use kiosk_kernel::ManualClock;
    use kiosk_knowledge::KnowledgeEntry;
    use std::sync::Mutex;

    struct Harness {
        clock: Arc<ManualClock>,
        speech: Arc<RecordingSpeech>,
        display: Arc<RecordingDisplay>,
        controller: SessionController,
    }

    fn harness_with(config: SessionConfig) -> Harness {
        let clock = Arc::new(ManualClock::new());
        let speech = Arc::new(RecordingSpeech::default());
        let display = Arc::new(RecordingDisplay::default());
        let mut controller =
            SessionController::new(config, clock.clone(), speech.clone(), display.clone())
                .with_greetings(GreetingPicker::seeded(3));
        controller.reset_to_idle();
        Harness {
            clock,
            speech,
            display,
            controller,
        }
    }

    fn harness() -> Harness {
        harness_with(SessionConfig::default())
    }

    fn licence_table() -> KnowledgeTable {
        let mut t = KnowledgeTable::new();
        t.push_category(
            "Licenses",
            vec![
                KnowledgeEntry::bilingual("ใบขับขี่ ทำใหม่", "ไปที่ช่อง 3", "Go to counter 3"),
                KnowledgeEntry::bilingual("ภาษี ต่อภาษี", "ไปที่ช่อง 5", "Go to counter 5"),
            ],
        );
        t.push_quick_question([(Language::Thai, "ทำใบขับขี่"), (Language::English, "New license")]);
        t
    }

    fn ask(h: &mut Harness, text: &str) {
        h.controller.handle(SessionInput::QuerySubmitted {
            text: text.to_string(),
            origin: QueryOrigin::Typed,
        });
    }

    /// Simulate the engine finishing the current utterance.
    fn finish_speech(h: &mut Harness) {
        let id = h.speech.last_request().expect("something spoken").utterance;
        h.controller.handle(SessionInput::SpeechStarted(id));
        h.controller.handle(SessionInput::SpeechEnded(id));
    }

    fn arrive(h: &mut Harness) {
        let since = h.clock.now();
        h.controller.handle(SessionInput::PresenceDetected { since });
        h.controller.handle(SessionInput::PresenceConfirmed);
    }

    #[test]
    fn confirmed_presence_greets_once_per_visit() {
        let mut h = harness();
        arrive(&mut h);
        assert_eq!(h.controller.phase(), SessionPhase::Engaging);
        assert_eq!(h.speech.requests().len(), 1);

        // Repeated confirmations without leaving never greet again.
        h.controller.handle(SessionInput::PresenceConfirmed);
        finish_speech(&mut h);
        h.controller.handle(SessionInput::PresenceConfirmed);
        assert_eq!(h.speech.requests().len(), 1);
        assert_eq!(h.controller.phase(), SessionPhase::Listening);

        // After the visitor leaves, the next one is greeted.
        h.controller.handle(SessionInput::PresenceCleared);
        arrive(&mut h);
        assert_eq!(h.speech.requests().len(), 2);
    }

    #[test]
    fn greeting_finish_arms_idle_deadline() {
        let mut h = harness();
        assert_eq!(h.controller.idle_deadline(), None);
        arrive(&mut h);
        finish_speech(&mut h);
        assert_eq!(
            h.controller.idle_deadline(),
            Some(h.clock.now() + Duration::from_secs(30))
        );
    }

    #[test]
    fn thai_query_is_answered_in_thai() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ทำใบขับขี่ใหม่ที่ไหน");
        assert!(h.controller.is_busy());
        assert_eq!(h.speech.spoken_texts(), vec!["ไปที่ช่อง 3".to_string()]);
        assert_eq!(h.display.last_text().as_deref(), Some("ไปที่ช่อง 3"));
        finish_speech(&mut h);
        assert_eq!(h.controller.phase(), SessionPhase::Listening);
    }

    #[test]
    fn new_query_preempts_answer_in_flight() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ทำใบขับขี่ใหม่");
        let first = h.speech.last_request().unwrap().utterance;
        h.controller.handle(SessionInput::SpeechStarted(first));

        ask(&mut h, "ต่อภาษี");
        let second = h.speech.last_request().unwrap().utterance;
        assert_eq!(h.speech.cancel_count(), 1);

        // The cancelled answer's end arrives late and must not finish B.
        h.controller.handle(SessionInput::SpeechEnded(first));
        assert!(h.controller.is_busy());
        assert!(h.controller.is_speaking());

        h.controller.handle(SessionInput::SpeechEnded(second));
        assert_eq!(h.controller.phase(), SessionPhase::Listening);
        assert_eq!(
            h.speech.spoken_texts(),
            vec!["ไปที่ช่อง 3".to_string(), "ไปที่ช่อง 5".to_string()]
        );
    }

    #[test]
    fn visitor_already_asking_is_not_greeted() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ต่อภาษี");
        arrive(&mut h);
        // Only the answer was spoken; the busy session did not greet.
        assert_eq!(h.speech.requests().len(), 1);
        assert!(h.controller.has_greeted());
    }

    #[test]
    fn visitor_confirmed_while_answer_plays_is_greeted_afterwards() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ต่อภาษี");
        h.controller.handle(SessionInput::PresenceCleared);

        // A new visitor settles in while the previous answer is still playing.
        arrive(&mut h);
        assert_eq!(h.speech.requests().len(), 1);
        assert!(!h.controller.has_greeted());

        finish_speech(&mut h);
        assert_eq!(h.speech.requests().len(), 2);
        assert_eq!(h.controller.phase(), SessionPhase::Engaging);
        assert!(h.controller.has_greeted());

        finish_speech(&mut h);
        for _ in 0..120 {
            h.clock.advance(Duration::from_millis(500));
            h.controller.handle(SessionInput::PresenceSeen);
            h.controller.handle(SessionInput::Tick);
        }
        assert_eq!(h.speech.requests().len(), 2);
        assert_eq!(h.controller.phase(), SessionPhase::Listening);
    }

    #[test]
    fn deferred_greeting_is_dropped_when_visitor_leaves_first() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ต่อภาษี");
        h.controller.handle(SessionInput::PresenceCleared);
        arrive(&mut h);
        h.controller.handle(SessionInput::PresenceCleared);

        finish_speech(&mut h);
        assert_eq!(h.speech.requests().len(), 1);
        assert_eq!(h.controller.phase(), SessionPhase::Listening);
    }

    #[test]
    fn deferred_greeting_is_skipped_once_the_visitor_asks() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ต่อภาษี");
        h.controller.handle(SessionInput::PresenceCleared);
        arrive(&mut h);
        ask(&mut h, "ทำใบขับขี่ใหม่");

        finish_speech(&mut h);
        assert_eq!(
            h.speech.spoken_texts(),
            vec!["ไปที่ช่อง 5".to_string(), "ไปที่ช่อง 3".to_string()]
        );
    }

    #[test]
    fn empty_table_speaks_not_found() {
        let mut h = harness();
        h.controller.set_knowledge(KnowledgeTable::new());
        ask(&mut h, "where is the toilet");
        assert_eq!(
            h.speech.spoken_texts(),
            vec![messages::not_found(Language::Thai).to_string()]
        );
    }

    #[test]
    fn query_before_knowledge_loads_shows_please_wait() {
        let mut h = harness();
        ask(&mut h, "ต่อภาษี");
        assert!(!h.controller.is_busy());
        assert!(h.speech.requests().is_empty());
        assert_eq!(
            h.display.last_text().as_deref(),
            Some(messages::please_wait(Language::Thai))
        );
    }

    #[test]
    fn tap_at_29s_defers_reset_until_59s() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ต่อภาษี");
        finish_speech(&mut h);

        h.clock.advance(Duration::from_secs(29));
        h.controller.handle(SessionInput::ManualInteraction);

        h.clock.advance(Duration::from_millis(29_900));
        h.controller.handle(SessionInput::Tick);
        assert_eq!(h.controller.phase(), SessionPhase::Listening);

        h.clock.advance(Duration::from_millis(100));
        h.controller.handle(SessionInput::Tick);
        assert_eq!(h.controller.phase(), SessionPhase::Idle);
        assert_eq!(
            h.display.last_text().as_deref(),
            Some(messages::welcome(Language::Thai))
        );
    }

    #[test]
    fn enormous_idle_timeout_never_fires() {
        let config = SessionConfig {
            idle_timeout: Duration::from_secs(u64::MAX),
            ..SessionConfig::default()
        };
        let mut h = harness_with(config);
        h.controller.set_knowledge(licence_table());
        h.controller.handle(SessionInput::ManualInteraction);
        ask(&mut h, "ต่อภาษี");
        finish_speech(&mut h);

        h.clock.advance(Duration::from_secs(3600));
        h.controller.handle(SessionInput::Tick);
        assert_eq!(h.controller.idle_deadline(), None);
        assert_eq!(h.controller.phase(), SessionPhase::Listening);
    }

    #[test]
    fn no_reset_while_someone_is_present() {
        let mut h = harness();
        arrive(&mut h);
        finish_speech(&mut h);

        h.clock.advance(Duration::from_secs(45));
        h.controller.handle(SessionInput::Tick);
        assert_eq!(h.controller.phase(), SessionPhase::Listening);
        assert!(h.controller.idle_deadline().is_some());

        h.controller.handle(SessionInput::PresenceCleared);
        h.clock.advance(Duration::from_secs(30));
        h.controller.handle(SessionInput::Tick);
        assert_eq!(h.controller.phase(), SessionPhase::Idle);
    }

    #[test]
    fn no_reset_while_answer_is_still_speaking() {
        let mut config = SessionConfig::default();
        config.watchdog = WatchdogPolicy {
            per_char: Duration::ZERO,
            floor: Duration::from_secs(120),
        };
        let mut h = harness_with(config);
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ต่อภาษี");

        h.clock.advance(Duration::from_secs(31));
        h.controller.handle(SessionInput::Tick);
        assert_eq!(h.controller.phase(), SessionPhase::Busy);
        assert!(h.controller.is_speaking());
        assert_eq!(
            h.controller.idle_deadline(),
            Some(h.clock.now() + Duration::from_secs(30))
        );
    }

    #[test]
    fn watchdog_unsticks_silent_engine() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ต่อภาษี");
        assert!(h.controller.is_busy());

        // The engine never reports back.
        h.clock.advance(Duration::from_secs(60));
        h.controller.handle(SessionInput::Tick);
        assert!(!h.controller.is_busy());
        assert!(!h.controller.is_speaking());
        assert_eq!(h.display.last_avatar(), Some(AvatarState::Idle));
    }

    #[test]
    fn engine_refusal_does_not_leave_session_busy() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        h.speech.fail_next();
        ask(&mut h, "ต่อภาษี");
        assert_eq!(h.controller.phase(), SessionPhase::Listening);
        assert_eq!(h.display.last_text().as_deref(), Some("ไปที่ช่อง 5"));
    }

    #[test]
    fn reset_to_idle_is_idempotent() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        arrive(&mut h);
        h.controller.handle(SessionInput::LanguageChanged(Language::English));

        h.controller.reset_to_idle();
        let snapshot = (
            h.controller.phase(),
            h.controller.has_greeted(),
            h.controller.someone_present(),
            h.controller.is_busy(),
            h.controller.language(),
            h.controller.idle_deadline(),
            h.display.last_text(),
            h.display.last_choices(),
        );
        h.controller.reset_to_idle();
        let again = (
            h.controller.phase(),
            h.controller.has_greeted(),
            h.controller.someone_present(),
            h.controller.is_busy(),
            h.controller.language(),
            h.controller.idle_deadline(),
            h.display.last_text(),
            h.display.last_choices(),
        );
        assert_eq!(snapshot, again);
        assert_eq!(snapshot.0, SessionPhase::Idle);
        assert!(!snapshot.1);
        assert_eq!(snapshot.4, Language::English);
    }

    #[test]
    fn clarification_confirm_speaks_stored_answer() {
        let mut config = SessionConfig::default();
        config.rank = RankPolicy {
            answer_threshold: 0.95,
            clarify_threshold: Some(0.35),
        };
        let mut h = harness_with(config);
        h.controller.set_knowledge(licence_table());

        // Containment of "ต่อภาษี" scores 0.97; "ภาษี" alone 0.94.
        ask(&mut h, "ภาษี");
        assert!(h.controller.awaiting_clarification());
        let choices = h.display.last_choices().unwrap();
        assert_eq!(choices[0].action, ChoiceAction::Confirm);
        assert_eq!(choices[1].action, ChoiceAction::Deny);
        finish_speech(&mut h);

        h.controller.handle(SessionInput::ClarificationReply { confirmed: true });
        assert!(!h.controller.awaiting_clarification());
        assert_eq!(h.speech.last_request().unwrap().text, "ไปที่ช่อง 5");
    }

    #[test]
    fn clarification_deny_restores_menu() {
        let mut config = SessionConfig::default();
        config.rank = RankPolicy {
            answer_threshold: 0.95,
            clarify_threshold: Some(0.35),
        };
        let mut h = harness_with(config);
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ภาษี");
        finish_speech(&mut h);
        let spoken = h.speech.requests().len();

        h.controller.handle(SessionInput::ClarificationReply { confirmed: false });
        assert_eq!(h.speech.requests().len(), spoken);
        assert_eq!(h.controller.phase(), SessionPhase::Listening);
        let menu = h.display.last_choices().unwrap();
        assert_eq!(menu, vec![Choice::ask("ทำใบขับขี่")]);
    }

    #[test]
    fn reset_invalidates_pending_clarification() {
        let mut config = SessionConfig::default();
        config.rank = RankPolicy {
            answer_threshold: 0.95,
            clarify_threshold: Some(0.35),
        };
        let mut h = harness_with(config);
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ภาษี");
        h.controller.reset_to_idle();
        let spoken = h.speech.requests().len();
        h.controller.handle(SessionInput::ClarificationReply { confirmed: true });
        assert_eq!(h.speech.requests().len(), spoken);
    }

    #[test]
    fn language_switch_drops_clarification_ranked_in_old_language() {
        let mut config = SessionConfig::default();
        config.rank = RankPolicy {
            answer_threshold: 0.95,
            clarify_threshold: Some(0.35),
        };
        let mut h = harness_with(config);
        h.controller.set_knowledge(licence_table());
        ask(&mut h, "ภาษี");
        finish_speech(&mut h);
        assert!(h.controller.awaiting_clarification());

        h.controller.handle(SessionInput::LanguageChanged(Language::English));
        assert!(!h.controller.awaiting_clarification());
        assert_eq!(h.display.last_choices().unwrap(), vec![Choice::ask("New license")]);
        assert_eq!(
            h.display.last_text().as_deref(),
            Some(messages::welcome(Language::English))
        );

        // A stale confirm speaks nothing, in either language.
        let spoken = h.speech.requests().len();
        h.controller.handle(SessionInput::ClarificationReply { confirmed: true });
        assert_eq!(h.speech.requests().len(), spoken);
    }

    #[test]
    fn language_switch_redraws_menu_and_answers_in_english() {
        let mut h = harness();
        h.controller.set_knowledge(licence_table());
        h.controller.handle(SessionInput::LanguageChanged(Language::English));
        assert_eq!(h.display.last_choices().unwrap(), vec![Choice::ask("New license")]);
        assert_eq!(
            h.display.last_text().as_deref(),
            Some(messages::welcome(Language::English))
        );

        ask(&mut h, "ต่อภาษี");
        let req = h.speech.last_request().unwrap();
        assert_eq!(req.text, "Go to counter 5");
        assert_eq!(req.language, Language::English);
    }

    #[test]
    fn avatar_assets_reach_the_display() {
        let mut h = harness();
        let mut table = licence_table();
        table.set_avatar_asset(AvatarState::Talking, "talk.json");
        h.controller.set_knowledge(table);
        assert_eq!(
            h.display.assets(),
            vec![(AvatarState::Talking, "talk.json".to_string())]
        );
    }

    #[derive(Default)]
    struct MemoryLog(Mutex<Vec<String>>);

    impl QueryLog for MemoryLog {
        fn record(&self, query: &str) {
            self.0.lock().unwrap().push(query.to_string());
        }
    }

    #[test]
    fn queries_are_logged_even_before_knowledge_loads() {
        let log = Arc::new(MemoryLog::default());
        let mut h = harness();
        h.controller = SessionController::new(
            SessionConfig::default(),
            h.clock.clone(),
            h.speech.clone(),
            h.display.clone(),
        )
        .with_query_log(log.clone());
        ask(&mut h, "  ต่อภาษี  ");
        ask(&mut h, "   ");
        assert_eq!(*log.0.lock().unwrap(), vec!["ต่อภาษี".to_string()]);
    }
}
