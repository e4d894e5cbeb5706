use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Languages the kiosk can answer in.
///
/// The knowledge table stores one answer column per language; the active
/// language decides which column is read and which voice is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "th")]
    Thai,
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// Short language code used in config files and the sheet payload.
    pub fn code(self) -> &'static str {
        match self {
            Language::Thai => "th",
            Language::English => "en",
        }
    }

    /// BCP-47 locale handed to the speech engine.
    pub fn speech_locale(self) -> &'static str {
        match self {
            Language::Thai => "th-TH",
            Language::English => "en-US",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "th" | "thai" | "th-th" => Ok(Language::Thai),
            "en" | "english" | "en-us" => Ok(Language::English),
            other => Err(KioskError::Config(format!("unknown language '{other}'"))),
        }
    }
}

/// Animation state shown by the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarState {
    Idle,
    Thinking,
    Talking,
}

impl AvatarState {
    /// Lowercase label used as the lookup key in the avatar asset sheet.
    pub fn label(self) -> &'static str {
        match self {
            AvatarState::Idle => "idle",
            AvatarState::Thinking => "thinking",
            AvatarState::Talking => "talking",
        }
    }
}

/// Monotonic identifier for one spoken utterance.
///
/// Speech lifecycle callbacks carry the id so that late callbacks from a
/// cancelled utterance can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utt-{}", self.0)
    }
}

/// A single request handed to the speech engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub utterance: UtteranceId,
    pub text: String,
    pub language: Language,
    /// Preferred voice names, most preferred first.
    pub voice_hints: Vec<String>,
    /// Pass-through output volume in `[0.0, 1.0]`.
    pub volume: f32,
}

/// Axis-aligned bounding box in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One sample from the presence sensor.
///
/// The receive time is stamped by whoever consumes the sample, so the
/// observation itself only describes what the sensor saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceObservation {
    pub person_seen: bool,
    /// Detector confidence in `[0.0, 1.0]`; `1.0` for plain boolean sources.
    pub confidence: f32,
    pub bbox: Option<BoundingBox>,
}

impl PresenceObservation {
    /// A positive boolean sample.
    pub fn seen() -> Self {
        Self {
            person_seen: true,
            confidence: 1.0,
            bbox: None,
        }
    }

    /// A negative sample.
    pub fn absent() -> Self {
        Self {
            person_seen: false,
            confidence: 0.0,
            bbox: None,
        }
    }
}

/// Where a submitted query came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOrigin {
    Typed,
    Transcribed,
    QuickQuestion,
}

/// Unified event wrapper for the kiosk event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "kiosk-cli::repl"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` with a fresh id and the current wall-clock time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the kiosk event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// Raw, undebounced sensor sample.
    PresenceSample(PresenceObservation),
    /// The presence sensor failed and has been switched off.
    SensorFault { component: String, message: String },
    QuerySubmitted { text: String, origin: QueryOrigin },
    /// Visitor answered a "did you mean" prompt.
    ClarificationReply { confirmed: bool },
    /// Any tap, click or keypress.
    ManualInteraction,
    LanguageChanged(Language),
    SpeechStarted(UtteranceId),
    SpeechEnded(UtteranceId),
    SpeechFailed { utterance: UtteranceId, message: String },
}

/// Global error type spanning knowledge fetches, sensors and the speech engine.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KioskError {
    #[error("Knowledge fetch failed: {0}")]
    KnowledgeFetch(String),

    #[error("Sensor fault on {component}: {details}")]
    Sensor {
        component: String,
        details: String,
        /// `true` when retrying cannot help (permission denied, no device).
        permanent: bool,
    },

    #[error("Speech engine error: {0}")]
    Speech(String),

    #[error("Event bus error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_serializes_as_short_code() {
        let json = serde_json::to_string(&Language::English).unwrap();
        assert_eq!(json, "\"en\"");
        let back: Language = serde_json::from_str("\"th\"").unwrap();
        assert_eq!(back, Language::Thai);
    }

    #[test]
    fn language_parses_codes_and_locales() {
        assert_eq!("TH".parse::<Language>().unwrap(), Language::Thai);
        assert_eq!("en-US".parse::<Language>().unwrap(), Language::English);
        assert!(matches!(
            "fr".parse::<Language>(),
            Err(KioskError::Config(msg)) if msg.contains("fr")
        ));
    }

    #[test]
    fn default_language_is_thai() {
        assert_eq!(Language::default(), Language::Thai);
        assert_eq!(Language::default().speech_locale(), "th-TH");
    }

    #[test]
    fn avatar_state_labels_are_lowercase() {
        assert_eq!(AvatarState::Talking.label(), "talking");
        let json = serde_json::to_string(&AvatarState::Thinking).unwrap();
        assert_eq!(json, "\"thinking\"");
    }

    #[test]
    fn event_new_stamps_source() {
        let event = Event::new(
            "kiosk-cli::repl",
            EventPayload::QuerySubmitted {
                text: "where is counter 3".to_string(),
                origin: QueryOrigin::Typed,
            },
        );
        assert_eq!(event.source, "kiosk-cli::repl");
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
    }

    #[test]
    fn kiosk_error_display() {
        let err = KioskError::Sensor {
            component: "front_camera".to_string(),
            details: "permission denied".to_string(),
            permanent: true,
        };
        assert!(err.to_string().contains("front_camera"));
        assert!(KioskError::Speech("stalled".into()).to_string().contains("stalled"));
    }
}
