//! Recording fakes for the speech and display boundaries.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use kiosk_middleware::{Choice, Display, SpeechEngine};
use kiosk_types::{AvatarState, KioskError, SpeechRequest};

#[derive(Default)]
pub struct RecordingSpeech {
    requests: Mutex<Vec<SpeechRequest>>,
    cancels: AtomicUsize,
    fail_next: AtomicBool,
}

impl RecordingSpeech {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<SpeechRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.text).collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl SpeechEngine for RecordingSpeech {
    fn speak(&self, request: &SpeechRequest) -> Result<(), KioskError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(KioskError::Speech("no voices available".into()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    texts: Mutex<Vec<String>>,
    avatars: Mutex<Vec<AvatarState>>,
    choices: Mutex<Vec<Vec<Choice>>>,
    assets: Mutex<Vec<(AvatarState, String)>>,
}

impl RecordingDisplay {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts.lock().unwrap().last().cloned()
    }

    pub fn last_avatar(&self) -> Option<AvatarState> {
        self.avatars.lock().unwrap().last().copied()
    }

    pub fn last_choices(&self) -> Option<Vec<Choice>> {
        self.choices.lock().unwrap().last().cloned()
    }

    pub fn assets(&self) -> Vec<(AvatarState, String)> {
        self.assets.lock().unwrap().clone()
    }
}

impl Display for RecordingDisplay {
    fn display_text(&self, text: &str) {
        self.texts.lock().unwrap().push(text.to_string());
    }

    fn set_avatar_state(&self, state: AvatarState) {
        self.avatars.lock().unwrap().push(state);
    }

    fn show_choices(&self, choices: &[Choice]) {
        self.choices.lock().unwrap().push(choices.to_vec());
    }

    fn set_avatar_assets(&self, assets: &[(AvatarState, String)]) {
        *self.assets.lock().unwrap() = assets.to_vec();
    }
}
