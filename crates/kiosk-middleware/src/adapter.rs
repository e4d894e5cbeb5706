//! The Universal Adapter Pattern.
//!
//! The kiosk core never speaks directly to a TTS engine or a screen.  It
//! calls the two boundary traits below, chosen once at construction time.
//! Lifecycle callbacks flow back the other way: a [`SpeechEngine`] reports
//! start / end / error by publishing to [`Topic::Speech`][crate::bus::Topic::Speech]
//! on the [`EventBus`][crate::bus::EventBus].
//!
//! # Overview
//!
//! - [`SpeechEngine`] – turns a [`SpeechRequest`] into audio.
//! - [`Display`] – renders text, quick-question choices and the avatar.

use kiosk_types::{AvatarState, KioskError, SpeechRequest};

/// A selectable button on the kiosk screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub label: String,
    pub action: ChoiceAction,
}

/// What happens when a [`Choice`] is pressed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceAction {
    /// Submit the text as a query (quick-question menu).
    Ask(String),
    /// Accept the "did you mean" suggestion.
    Confirm,
    /// Reject the "did you mean" suggestion.
    Deny,
}

impl Choice {
    pub fn ask(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            action: ChoiceAction::Ask(label.clone()),
            label,
        }
    }
}

/// A text-to-speech engine.
///
/// # Contract
///
/// * `speak` – begins speaking asynchronously and returns immediately. The
///   engine later publishes `SpeechStarted`, then `SpeechEnded` or
///   `SpeechFailed`, tagged with `request.utterance`.
/// * `cancel` – stops whatever is currently being spoken. Engines may still
///   deliver a late callback for the cancelled utterance; the coordinator
///   ignores callbacks whose id is not current.
pub trait SpeechEngine: Send + Sync {
    fn speak(&self, request: &SpeechRequest) -> Result<(), KioskError>;

    fn cancel(&self);
}

/// Visitor-facing screen. Owns no session state.
pub trait Display: Send + Sync {
    /// Replace the main response text.
    fn display_text(&self, text: &str);

    /// Switch the avatar animation.
    fn set_avatar_state(&self, state: AvatarState);

    /// Replace the row of buttons under the response text.
    fn show_choices(&self, choices: &[Choice]);

    /// Animation assets per avatar state, delivered once the knowledge
    /// table has loaded. Adapters without assets ignore it.
    fn set_avatar_assets(&self, _assets: &[(AvatarState, String)]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_choice_submits_its_label() {
        let choice = Choice::ask("ต่อใบขับขี่");
        assert_eq!(choice.label, "ต่อใบขับขี่");
        assert_eq!(choice.action, ChoiceAction::Ask("ต่อใบขับขี่".to_string()));
    }
}
